//! Builds virtual trees: from a template (expanding `#for` and `#if`) and
//! from a live subtree (the baseline for a first render).

use tracing::{debug, warn};
use trellis_core::{Evaluator, Params, Scope, Value};
use trellis_dom::{
    Binding, DirectiveError, Document, EventBinding, NodeId, NodeKey, NodeKind, VElement, VNode,
    VText,
};
use trellis_markup::{AttrKind, classify};

use crate::config::EngineConfig;
use crate::directive::{Entry, check_if, entries, parse_for};
use crate::runtime::Registry;

/// One template-to-tree pass.
pub struct Builder<'a> {
    template: &'a Document,
    scope: &'a mut dyn Scope,
    evaluator: &'a Evaluator,
    registry: &'a Registry,
    config: &'a EngineConfig,
    serial: usize,
    warned: bool,
}

impl<'a> Builder<'a> {
    pub fn new(
        template: &'a Document,
        scope: &'a mut dyn Scope,
        evaluator: &'a Evaluator,
        registry: &'a Registry,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            template,
            scope,
            evaluator,
            registry,
            config,
            serial: 0,
            warned: false,
        }
    }

    /// Builds the children of `root` into a fragment.
    pub fn build(mut self, root: NodeId, params: &Params) -> Result<VNode, DirectiveError> {
        let mut children = Vec::new();
        for &child in self.template.children(root) {
            self.node(child, params, &[], &mut children)?;
        }
        debug!(elements = self.serial, roots = children.len(), "built tree");
        Ok(VNode::Fragment(children))
    }

    fn node(
        &mut self,
        id: NodeId,
        params: &Params,
        iteration: &[usize],
        out: &mut Vec<VNode>,
    ) -> Result<(), DirectiveError> {
        let template = self.template;
        match template.kind(id) {
            NodeKind::Text(content) => out.push(VNode::Text(VText {
                content: content.clone(),
                mask: None,
            })),
            NodeKind::Comment(_) => {}
            NodeKind::Fragment => {
                for &child in template.children(id) {
                    self.node(child, params, iteration, out)?;
                }
            }
            NodeKind::Element(tag) => match template.attribute(id, "#for") {
                Some(value) => self.expand(id, tag, value, params, iteration, out)?,
                None => self.element(id, tag, params, iteration, out)?,
            },
        }
        Ok(())
    }

    /// Replaces a `#for` element by one clone per entry of its iterable.
    fn expand(
        &mut self,
        id: NodeId,
        tag: &str,
        value: &str,
        params: &Params,
        iteration: &[usize],
        out: &mut Vec<VNode>,
    ) -> Result<(), DirectiveError> {
        if !self.warned && self.template.has_attribute(id, "#if") {
            warn!(tag, "#for and #if on one element; #if is evaluated per clone");
            self.warned = true;
        }
        let directive = parse_for(value, tag)?;
        let iterable = self
            .evaluator
            .value(&directive.iterable, params, &mut *self.scope)
            .map_err(|e| DirectiveError::evaluation(directive.iterable.as_str(), tag, e))?;
        let items = entries(&iterable)
            .map_err(|e| DirectiveError::evaluation(directive.iterable.as_str(), tag, e))?;

        let mut path = iteration.to_vec();
        path.push(0);
        for (position, entry) in items.into_iter().enumerate() {
            let mut locals = params.clone();
            match entry {
                Entry::Item(index, item) => {
                    locals.insert(directive.binding.clone(), item);
                    locals.insert("$index".to_string(), Value::from(index));
                }
                Entry::Prop(key, item) => {
                    locals.insert(directive.binding.clone(), Value::from(key.as_str()));
                    locals.insert("$prop".to_string(), Value::from(key));
                    locals.insert("$value".to_string(), item);
                }
            }
            if let Some(last) = path.last_mut() {
                *last = position;
            }
            self.element(id, tag, &locals, &path, out)?;
        }
        Ok(())
    }

    fn element(
        &mut self,
        id: NodeId,
        tag: &str,
        params: &Params,
        iteration: &[usize],
        out: &mut Vec<VNode>,
    ) -> Result<(), DirectiveError> {
        let template = self.template;
        let key = NodeKey::new(id, iteration);

        if let Some(value) = template.attribute(id, "#if") {
            let condition = check_if(value, tag)?;
            let shown = self
                .evaluator
                .condition(condition, params, &mut *self.scope)
                .map_err(|e| DirectiveError::evaluation(condition, tag, e))?;
            if !shown {
                out.push(VNode::Text(VText {
                    content: String::new(),
                    mask: Some(key),
                }));
                return Ok(());
            }
        }

        let mut el = VElement::new(tag);
        el.serial = self.serial;
        self.serial += 1;
        el.key = Some(key);
        el.params = template.dataset(id);
        el.params.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));

        for (name, value) in template.attributes(id) {
            match classify(name) {
                AttrKind::If | AttrKind::For => {}
                AttrKind::Binding(selector) => el.custom_attrs.push(Binding::new(selector, value)),
                AttrKind::Event(raw) => el.custom_events.push(EventBinding::parse(raw, value)),
                AttrKind::Static if self.registry.claims(name) => {
                    el.custom_attrs.push(Binding::new(name, value))
                }
                AttrKind::Static => el.static_attrs.push((name.to_string(), value.to_string())),
            }
        }

        if self.config.is_boundary(tag) {
            el.opaque = Some(id);
        } else {
            for &child in template.children(id) {
                self.node(child, params, iteration, &mut el.children)?;
            }
        }
        out.push(VNode::Element(el));
        Ok(())
    }
}

/// Describes what is currently under `container`, without evaluating
/// anything. Boundaries keep a handle to their live element.
pub fn snapshot(doc: &Document, container: NodeId, config: &EngineConfig) -> VNode {
    VNode::Fragment(
        doc.children(container)
            .iter()
            .map(|&child| snapshot_node(doc, child, config))
            .collect(),
    )
}

fn snapshot_node(doc: &Document, id: NodeId, config: &EngineConfig) -> VNode {
    match doc.kind(id) {
        NodeKind::Element(tag) => {
            let mut el = VElement::new(tag.as_str());
            el.static_attrs = doc
                .attributes(id)
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            if config.is_boundary(tag) {
                el.opaque = Some(id);
            } else {
                el.children = doc
                    .children(id)
                    .iter()
                    .map(|&child| snapshot_node(doc, child, config))
                    .collect();
            }
            VNode::Element(el)
        }
        NodeKind::Fragment => VNode::Fragment(
            doc.children(id)
                .iter()
                .map(|&child| snapshot_node(doc, child, config))
                .collect(),
        ),
        // comments hold a position like any other leaf
        NodeKind::Text(content) | NodeKind::Comment(content) => VNode::Text(VText {
            content: content.clone(),
            mask: None,
        }),
    }
}
