//! Attribute appliers: the built-in selectors plus a per-engine registry
//! consulted before them.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;
use trellis_core::Value;
use trellis_dom::{Binding, DirectiveError, Document, NodeId};
use trellis_markup::parse_fragment;
use trellis_style::{set_class_name, set_style, toggle_class};

/// Writes an evaluated binding onto an element.
pub trait Applier {
    fn apply(
        &self,
        doc: &mut Document,
        node: NodeId,
        binding: &Binding,
        value: &Value,
    ) -> Result<(), DirectiveError>;
}

struct FnApplier<F>(F);

impl<F> Applier for FnApplier<F>
where
    F: Fn(&mut Document, NodeId, &Binding, &Value) -> Result<(), DirectiveError>,
{
    fn apply(
        &self,
        doc: &mut Document,
        node: NodeId,
        binding: &Binding,
        value: &Value,
    ) -> Result<(), DirectiveError> {
        (self.0)(doc, node, binding, value)
    }
}

/// Custom appliers keyed by selector.
///
/// A binding is matched on its full name first, then on its first dotted
/// segment. A registered selector also claims the bare attribute of the
/// same name, so `tooltip="expr"` is treated like `[tooltip]="expr"`.
#[derive(Clone, Default)]
pub struct Registry {
    appliers: IndexMap<String, Rc<dyn Applier>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.appliers.keys()).finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<A: Applier + 'static>(&mut self, selector: &str, applier: A) {
        self.appliers
            .insert(selector.to_ascii_lowercase(), Rc::new(applier));
    }

    pub fn register_fn<F>(&mut self, selector: &str, f: F)
    where
        F: Fn(&mut Document, NodeId, &Binding, &Value) -> Result<(), DirectiveError> + 'static,
    {
        self.register(selector, FnApplier(f));
    }

    pub fn with_fn<F>(mut self, selector: &str, f: F) -> Self
    where
        F: Fn(&mut Document, NodeId, &Binding, &Value) -> Result<(), DirectiveError> + 'static,
    {
        self.register_fn(selector, f);
        self
    }

    pub fn len(&self) -> usize {
        self.appliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appliers.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Rc<dyn Applier>> {
        self.appliers.get(name).or_else(|| {
            let head = name.split('.').next()?;
            self.appliers.get(head)
        })
    }

    /// Whether a bare attribute is a binding for a registered applier.
    pub fn claims(&self, attribute: &str) -> bool {
        !self.appliers.is_empty() && self.get(attribute).is_some()
    }

    /// Registered applier if any, the built-ins otherwise.
    pub fn apply(
        &self,
        doc: &mut Document,
        node: NodeId,
        binding: &Binding,
        value: &Value,
    ) -> Result<(), DirectiveError> {
        trace!(node = node.index(), binding = %binding.name, %value, "apply");
        match self.get(&binding.name) {
            Some(applier) => applier.apply(doc, node, binding, value),
            None => apply_builtin(doc, node, binding, value),
        }
    }

    /// Rejects values the built-ins would fail on halfway through a pass.
    pub(crate) fn precheck(&self, binding: &Binding, value: &Value) -> Result<(), DirectiveError> {
        if self.get(&binding.name).is_none() && binding.name == "innerhtml" {
            parse_fragment(&display_or_empty(value))?;
        }
        Ok(())
    }
}

fn display_or_empty(value: &Value) -> String {
    if value.is_nullish() {
        String::new()
    } else {
        value.to_display_string()
    }
}

/// The default selectors: `style.<prop>[.<unit>]`, `class.<name>`,
/// `classname`, `attr.<name>`/`attribute.<name>`, `innerhtml`, and the
/// property-or-attribute fallback for anything else.
pub fn apply_builtin(
    doc: &mut Document,
    node: NodeId,
    binding: &Binding,
    value: &Value,
) -> Result<(), DirectiveError> {
    match binding.segments().as_slice() {
        ["style", property, rest @ ..] => {
            if value.is_nullish() {
                set_style(doc, node, property, None);
            } else {
                let unit = rest.first().copied().unwrap_or_default();
                let css = format!("{}{unit}", value.to_display_string());
                set_style(doc, node, property, Some(css.as_str()));
            }
        }
        ["class", class, ..] => {
            toggle_class(doc, node, class, value.is_truthy());
        }
        ["classname"] => set_class_name(doc, node, &display_or_empty(value)),
        ["attr" | "attribute", name, ..] => {
            let text = match value {
                Value::Object(_) | Value::Array(_) => value.to_json().to_string(),
                other => other.to_display_string(),
            };
            if doc.attribute(node, name) != Some(text.as_str()) {
                doc.set_attribute(node, *name, text);
            }
        }
        ["innerhtml"] => doc.set_inner_html(node, &display_or_empty(value))?,
        [name, ..] => {
            if doc.has_property(node, name) {
                if doc.property(node, name).as_ref() != Some(value) {
                    doc.set_property(node, name, value.clone());
                }
            } else if value.is_truthy() {
                let text = value.to_display_string();
                if doc.attribute(node, name) != Some(text.as_str()) {
                    doc.set_attribute(node, *name, text);
                }
            } else {
                doc.remove_attribute(node, name);
            }
        }
        [] => {}
    }
    Ok(())
}
