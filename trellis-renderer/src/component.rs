//! Component host: the lifecycle wrapper that owns a document, renders a
//! component's template into its element and re-renders on change.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use tracing::{debug, trace};
use trellis_core::{Params, RenderQueue, Scope, Ticket, Value};
use trellis_dom::{DirectiveError, Document, Event, NodeId};
use trellis_style::{Selector, SelectorError, query_selector, query_selector_all};

use crate::config::EngineConfig;
use crate::reconcile::PatchStats;
use crate::runtime::Registry;
use crate::tree::TreeNode;

/// A scope that knows how to present itself.
pub trait Component: Scope + 'static {
    fn template(&self) -> String;

    /// Stylesheets placed in a `<style>` element ahead of the template.
    fn styles(&self) -> Vec<String> {
        Vec::new()
    }

    /// Host attributes whose changes are parsed and written to the scope.
    fn observed_attributes(&self) -> Vec<String> {
        Vec::new()
    }

    fn on_connected(&mut self) {}

    fn on_changes(&mut self, _name: &str, _old: &Value, _new: &Value) {}

    fn on_disconnected(&mut self) {}
}

/// Attribute text as a value: JSON when it parses, the raw string otherwise.
pub fn parse_attribute(raw: &str) -> Value {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(raw))
}

/// Mounts a [`Component`] under its own element of a private [`Document`].
pub struct Host<C: Component> {
    component: Rc<RefCell<C>>,
    scope: Rc<RefCell<dyn Scope>>,
    doc: Document,
    element: NodeId,
    tree: TreeNode,
    queue: Rc<RenderQueue>,
    params: Params,
    connected: bool,
}

impl<C: Component> Host<C> {
    pub fn new(tag: &str, component: C) -> Self {
        Self::with_config(tag, component, EngineConfig::default())
    }

    pub fn with_config(tag: &str, component: C, config: EngineConfig) -> Self {
        let component = Rc::new(RefCell::new(component));
        let scope: Rc<RefCell<dyn Scope>> = component.clone();
        let mut doc = Document::new();
        let element = doc.create_element(tag.to_ascii_lowercase());
        let root = doc.root();
        doc.append_child(root, element);
        Self {
            component,
            scope,
            doc,
            element,
            tree: TreeNode::with_config(config),
            queue: Rc::new(RenderQueue::new()),
            params: Params::new(),
            connected: false,
        }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.tree = std::mem::take(&mut self.tree).with_registry(registry);
        self
    }

    /// Parameters visible to every expression of this component.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn component(&self) -> Ref<'_, C> {
        self.component.borrow()
    }

    pub fn component_mut(&self) -> RefMut<'_, C> {
        self.component.borrow_mut()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn tree(&self) -> &TreeNode {
        &self.tree
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Shared handle for requesting a pass from outside the host, e.g. from
    /// a component method.
    pub fn queue(&self) -> Rc<RenderQueue> {
        Rc::clone(&self.queue)
    }

    pub fn html(&self) -> String {
        self.doc.inner_html(self.element)
    }

    fn markup(&self) -> String {
        let component = self.component.borrow();
        let styles = component.styles();
        let template = component.template();
        if styles.is_empty() {
            template
        } else {
            format!("<style>{}</style>{template}", styles.join("\n"))
        }
    }

    /// Renders the template into the host element, then runs `on_connected`.
    pub fn connect(&mut self) -> Result<PatchStats, DirectiveError> {
        let markup = self.markup();
        let stats = {
            let _guard = self.queue.begin();
            self.tree
                .render(&mut self.doc, self.element, &markup, &self.scope, &self.params)?
        };
        self.connected = true;
        debug!(element = self.element.index(), "connected");
        self.component.borrow_mut().on_connected();
        self.settle()?;
        Ok(stats)
    }

    pub fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        self.queue.cancel();
        self.component.borrow_mut().on_disconnected();
        debug!(element = self.element.index(), "disconnected");
    }

    /// Asks for a pass without running it.
    pub fn schedule(&self) -> Ticket {
        self.queue.schedule()
    }

    /// Requests a pass. With batching on it waits for [`Host::settle`];
    /// otherwise it runs now.
    pub fn update(&mut self) -> Result<usize, DirectiveError> {
        self.queue.schedule();
        if self.tree.config().batch_updates {
            Ok(0)
        } else {
            self.settle()
        }
    }

    /// Writes the entries of `details` the scope already has, then updates.
    pub fn update_with(&mut self, details: &Params) -> Result<usize, DirectiveError> {
        {
            let mut scope = self.scope.borrow_mut();
            for (name, value) in details {
                if scope.get(name).is_some() {
                    scope.set(name, value.clone()).map_err(|e| {
                        DirectiveError::evaluation(name.as_str(), self.tag(), e)
                    })?;
                }
            }
        }
        self.update()?;
        self.settle()
    }

    /// Runs pending passes until none is left. Passes requested while one
    /// runs are folded into the next loop turn.
    pub fn settle(&mut self) -> Result<usize, DirectiveError> {
        if !self.connected {
            self.queue.cancel();
            return Ok(0);
        }
        let max = self.tree.config().max_flush_passes;
        let Self {
            tree,
            doc,
            scope,
            params,
            queue,
            ..
        } = self;
        queue.flush(max, || tree.update(doc, scope, params).map(|_| ()))
    }

    fn tag(&self) -> String {
        self.doc.tag(self.element).unwrap_or_default().to_string()
    }

    /// Sets a host attribute. Observed attributes are parsed, written to
    /// the scope and reported through `on_changes` unless the scope already
    /// holds an equal value. Returns whether the scope changed.
    pub fn set_attribute(&mut self, name: &str, raw: &str) -> Result<bool, DirectiveError> {
        let name = name.to_ascii_lowercase();
        let old = self
            .doc
            .attribute(self.element, &name)
            .map(parse_attribute)
            .unwrap_or(Value::Null);
        self.doc.set_attribute(self.element, name.as_str(), raw);

        let observed = self
            .component
            .borrow()
            .observed_attributes()
            .iter()
            .any(|a| a.eq_ignore_ascii_case(&name));
        if !observed {
            return Ok(false);
        }
        let new = parse_attribute(raw);
        {
            let mut component = self.component.borrow_mut();
            if component.get(&name).as_ref() == Some(&new) {
                trace!(%name, "attribute unchanged");
                return Ok(false);
            }
            component
                .set(&name, new.clone())
                .map_err(|e| DirectiveError::evaluation(name.as_str(), self.tag(), e))?;
            component.on_changes(&name, &old, &new);
        }
        self.update()?;
        self.settle()?;
        Ok(true)
    }

    pub fn el(&self, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(query_selector(&self.doc, self.element, &selector))
    }

    pub fn all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(query_selector_all(&self.doc, self.element, &selector))
    }

    /// Dispatches `event` at `target`, then re-renders.
    pub fn dispatch(&mut self, target: NodeId, mut event: Event) -> Result<Event, DirectiveError> {
        self.doc.dispatch(target, &mut event)?;
        self.update()?;
        self.settle()?;
        Ok(event)
    }

    pub fn click(&mut self, target: NodeId) -> Result<Event, DirectiveError> {
        self.dispatch(target, Event::new("click"))
    }
}
