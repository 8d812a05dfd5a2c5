//! Positional patching of a live subtree from two virtual trees.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{trace, warn};
use trellis_core::{Evaluator, Scope, Value};
use trellis_dom::{
    AttrPatch, DirectiveError, Document, NodeId, NodeKey, Step, VElement, VNode, diff_attrs, plan,
};
use trellis_markup::{AttrKind, classify};

use crate::config::EngineConfig;
use crate::events::{BoundEvent, Context, bind_event, slot_name};
use crate::runtime::Registry;

/// Evaluated custom attributes, by element serial, in declaration order.
pub(crate) type Resolved = HashMap<usize, Vec<Value>>;

/// Evaluates every custom attribute of `tree` before anything is touched.
pub(crate) fn resolve(
    tree: &VNode,
    scope: &mut dyn Scope,
    evaluator: &Evaluator,
    registry: &Registry,
    out: &mut Resolved,
) -> Result<(), DirectiveError> {
    if let VNode::Element(el) = tree {
        if !el.custom_attrs.is_empty() {
            let mut values = Vec::with_capacity(el.custom_attrs.len());
            for binding in &el.custom_attrs {
                let value = evaluator
                    .value(&binding.expression, &el.params, scope)
                    .map_err(|e| {
                        DirectiveError::evaluation(binding.expression.as_str(), el.tag.as_str(), e)
                    })?;
                registry.precheck(binding, &value)?;
                values.push(value);
            }
            out.insert(el.serial, values);
        }
    }
    for child in tree.children() {
        resolve(child, scope, evaluator, registry, out)?;
    }
    Ok(())
}

#[derive(Debug, Default)]
struct NodeState {
    applied: IndexMap<String, Value>,
    events: IndexMap<String, BoundEvent>,
}

impl NodeState {
    fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.events.is_empty()
    }
}

/// Live nodes and bookkeeping a tree keeps between passes.
#[derive(Debug, Default)]
pub(crate) struct Retained {
    /// One placeholder per hidden conditional, reused on every hide.
    masks: HashMap<NodeKey, NodeId>,
    mask_nodes: HashSet<NodeId>,
    /// Nested component elements, reused when their parent is rebuilt.
    boundaries: HashMap<NodeKey, NodeId>,
    nodes: HashMap<NodeId, NodeState>,
}

impl Retained {
    pub(crate) fn masks(&self) -> usize {
        self.masks.len()
    }

    pub(crate) fn boundaries(&self) -> usize {
        self.boundaries.len()
    }

    pub(crate) fn bound_listeners(&self) -> usize {
        self.nodes.values().map(|s| s.events.len()).sum()
    }

    /// Forgets masks and nested components of loop clones that `tree` no
    /// longer has. Keys outside every loop are bounded by the template and
    /// always stay.
    pub(crate) fn prune(&mut self, tree: &VNode) -> usize {
        let mut present = HashSet::new();
        collect_keys(tree, &mut present);
        let stale = |key: &NodeKey| !key.iteration.is_empty() && !present.contains(key);

        let before = self.masks.len() + self.boundaries.len();
        self.masks.retain(|key, _| !stale(key));
        self.boundaries.retain(|key, _| !stale(key));
        let dropped = before - self.masks.len() - self.boundaries.len();
        if dropped > 0 {
            self.mask_nodes = self.masks.values().copied().collect();
        }
        dropped
    }
}

fn collect_keys(node: &VNode, out: &mut HashSet<NodeKey>) {
    match node {
        VNode::Text(text) => {
            if let Some(key) = &text.mask {
                out.insert(key.clone());
            }
        }
        VNode::Element(el) => {
            if let Some(key) = &el.key {
                out.insert(key.clone());
            }
        }
        VNode::Fragment(_) => {}
    }
    for child in node.children() {
        collect_keys(child, out);
    }
}

/// What one pass did to the live tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PatchStats {
    /// Positions that had no live node before.
    pub created: usize,
    /// Positions whose node was discarded and rebuilt.
    pub replaced: usize,
    /// Positions emptied to an empty text node.
    pub placeholders: usize,
    /// Positions patched in place.
    pub updated: usize,
    /// Custom attribute writes.
    pub applied: usize,
}

impl PatchStats {
    /// Whether the pass touched the live tree at all.
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.replaced == 0 && self.placeholders == 0 && self.applied == 0
    }
}

pub(crate) struct Patcher<'a> {
    doc: &'a mut Document,
    template: &'a Document,
    retained: &'a mut Retained,
    resolved: &'a Resolved,
    registry: &'a Registry,
    config: &'a EngineConfig,
    ctx: &'a Context,
    pub(crate) stats: PatchStats,
}

impl<'a> Patcher<'a> {
    pub(crate) fn new(
        doc: &'a mut Document,
        template: &'a Document,
        retained: &'a mut Retained,
        resolved: &'a Resolved,
        registry: &'a Registry,
        config: &'a EngineConfig,
        ctx: &'a Context,
    ) -> Self {
        Self {
            doc,
            template,
            retained,
            resolved,
            registry,
            config,
            ctx,
            stats: PatchStats::default(),
        }
    }

    /// Walks `max(new.len(), old.len())` positions under `parent`.
    pub(crate) fn patch_children(
        &mut self,
        parent: NodeId,
        new: &[VNode],
        old: &[VNode],
    ) -> Result<(), DirectiveError> {
        for (index, step) in plan(new, old).into_iter().enumerate() {
            let live = self.doc.child_at(parent, index);
            match step {
                Step::Create => {
                    let node = self.create(&new[index])?;
                    self.put(parent, node, live);
                    self.stats.created += 1;
                }
                Step::Placeholder => {
                    if let Some(existing) = live {
                        let empty = self.doc.create_text("");
                        self.doc.replace_child(parent, empty, existing);
                        self.discard(existing);
                        self.stats.placeholders += 1;
                    }
                }
                Step::Replace => {
                    let node = self.create(&new[index])?;
                    self.put(parent, node, live);
                    self.stats.replaced += 1;
                }
                Step::Update => match live {
                    Some(existing) => {
                        self.update(existing, &new[index], &old[index])?;
                        self.stats.updated += 1;
                    }
                    None => {
                        warn!(parent = parent.index(), index, "live node missing; recreating");
                        let node = self.create(&new[index])?;
                        self.doc.append_child(parent, node);
                        self.stats.created += 1;
                    }
                },
            }
        }
        Ok(())
    }

    /// Puts `node` where `existing` is, or at the end.
    fn put(&mut self, parent: NodeId, node: NodeId, existing: Option<NodeId>) {
        match existing {
            Some(existing) if existing != node => {
                self.doc.replace_child(parent, node, existing);
                self.discard(existing);
            }
            Some(_) => {}
            None => self.doc.append_child(parent, node),
        }
    }

    fn update(&mut self, live: NodeId, new: &VNode, old: &VNode) -> Result<(), DirectiveError> {
        match (new, old) {
            (VNode::Text(text), VNode::Text(_)) => {
                if let Some(key) = &text.mask {
                    self.retained.masks.insert(key.clone(), live);
                    self.retained.mask_nodes.insert(live);
                }
            }
            (VNode::Element(el), VNode::Element(prev)) => {
                if self.config.sync_static_attributes {
                    let mut touched = Vec::new();
                    for patch in diff_attrs(&prev.static_attrs, &el.static_attrs) {
                        match patch {
                            AttrPatch::Set(name, value) => {
                                self.doc.set_attribute(live, name.as_str(), value);
                                touched.push(name);
                            }
                            AttrPatch::Remove(name) => {
                                self.doc.remove_attribute(live, &name);
                                touched.push(name);
                            }
                        }
                    }
                    self.forget_applied(live, &touched);
                }
                self.bind_events(live, el);
                self.apply_attrs(live, el)?;
                if el.is_boundary() {
                    if let Some(key) = &el.key {
                        self.retained.boundaries.insert(key.clone(), live);
                    }
                } else {
                    self.patch_children(live, &el.children, &prev.children)?;
                }
            }
            (VNode::Fragment(children), VNode::Fragment(prev)) => {
                self.patch_children(live, children, prev)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Drops cached binding values whose target attribute was just
    /// rewritten from the template, so those bindings apply again.
    fn forget_applied(&mut self, node: NodeId, touched: &[String]) {
        if touched.is_empty() {
            return;
        }
        let registry = self.registry;
        if let Some(state) = self.retained.nodes.get_mut(&node) {
            state.applied.retain(|binding, _| {
                registry.get(binding).is_none()
                    && touched.iter().all(|attr| !writes_attribute(binding, attr))
            });
        }
    }

    /// Materializes a virtual node: static attributes, custom attributes,
    /// events, then children.
    fn create(&mut self, vnode: &VNode) -> Result<NodeId, DirectiveError> {
        match vnode {
            VNode::Text(text) => Ok(match &text.mask {
                Some(key) => self.mask(key),
                None => self.doc.create_text(text.content.as_str()),
            }),
            VNode::Fragment(children) => {
                let fragment = self.doc.create_fragment();
                for child in children {
                    let node = self.create(child)?;
                    self.doc.append_child(fragment, node);
                }
                Ok(fragment)
            }
            VNode::Element(el) => {
                let node = match el.opaque {
                    Some(source) => self.boundary(el, source),
                    None => self.doc.create_element(el.tag.as_str()),
                };
                for (name, value) in &el.static_attrs {
                    if self.doc.attribute(node, name) != Some(value.as_str()) {
                        self.doc.set_attribute(node, name.as_str(), value.as_str());
                    }
                }
                self.apply_attrs(node, el)?;
                self.bind_events(node, el);
                if !el.is_boundary() {
                    for child in &el.children {
                        let created = self.create(child)?;
                        self.doc.append_child(node, created);
                    }
                }
                Ok(node)
            }
        }
    }

    fn mask(&mut self, key: &NodeKey) -> NodeId {
        if let Some(&node) = self.retained.masks.get(key) {
            if self.doc.parent(node).is_none() {
                trace!(mask = node.index(), "reuse mask");
                return node;
            }
        }
        let node = self.doc.create_text("");
        self.retained.masks.insert(key.clone(), node);
        self.retained.mask_nodes.insert(node);
        node
    }

    /// The live element of a nested component: the retained one when it is
    /// detached, otherwise a copy of the template element with its
    /// directive attributes stripped.
    fn boundary(&mut self, el: &VElement, source: NodeId) -> NodeId {
        if let Some(&node) = el.key.as_ref().and_then(|k| self.retained.boundaries.get(k)) {
            if self.doc.parent(node).is_none() {
                trace!(boundary = node.index(), "reuse boundary");
                return node;
            }
        }
        let node = self.doc.import(self.template, source);
        let dynamic: Vec<String> = self
            .doc
            .attributes(node)
            .filter(|(name, _)| {
                !matches!(classify(name), AttrKind::Static) || self.registry.claims(name)
            })
            .map(|(name, _)| name.to_string())
            .collect();
        for name in dynamic {
            self.doc.remove_attribute(node, &name);
        }
        if let Some(key) = &el.key {
            self.retained.boundaries.insert(key.clone(), node);
        }
        node
    }

    /// Applies custom attributes whose value differs from the last one
    /// written to `node`.
    fn apply_attrs(&mut self, node: NodeId, el: &VElement) -> Result<(), DirectiveError> {
        let Some(values) = self.resolved.get(&el.serial) else {
            if let Some(state) = self.retained.nodes.get_mut(&node) {
                state.applied.clear();
            }
            return Ok(());
        };
        let mut state = self.retained.nodes.remove(&node).unwrap_or_default();
        state
            .applied
            .retain(|name, _| el.custom_attrs.iter().any(|b| &b.name == name));
        let mut result = Ok(());
        for (binding, value) in el.custom_attrs.iter().zip(values) {
            if state.applied.get(&binding.name) == Some(value) {
                continue;
            }
            if let Err(e) = self.registry.apply(self.doc, node, binding, value) {
                result = Err(e);
                break;
            }
            state.applied.insert(binding.name.clone(), value.clone());
            self.stats.applied += 1;
        }
        if !state.is_empty() {
            self.retained.nodes.insert(node, state);
        }
        result
    }

    fn bind_events(&mut self, node: NodeId, el: &VElement) {
        let mut state = self.retained.nodes.remove(&node).unwrap_or_default();
        if el.custom_events.is_empty() && state.events.is_empty() {
            if !state.is_empty() {
                self.retained.nodes.insert(node, state);
            }
            return;
        }
        let mut events = IndexMap::with_capacity(el.custom_events.len());
        for event in &el.custom_events {
            let slot = slot_name(event);
            let previous = state.events.shift_remove(&slot);
            let bound = bind_event(self.doc, node, el, event, previous, self.ctx);
            events.insert(slot, bound);
        }
        for (_, stale) in state.events.drain(..) {
            self.doc.remove_listener(node, stale.listener);
        }
        state.events = events;
        if !state.is_empty() {
            self.retained.nodes.insert(node, state);
        }
    }

    /// Forgets a node leaving the tree and drops its listeners. Masks and
    /// nested component elements below it are detached so a later pass can
    /// put them back; component internals are left alone.
    fn discard(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            self.retained.nodes.remove(&id);
            self.doc.clear_listeners(id);
            let boundary = self.doc.tag(id).is_some_and(|tag| self.config.is_boundary(tag));
            if id != node && (boundary || self.retained.mask_nodes.contains(&id)) {
                if let Some(parent) = self.doc.parent(id) {
                    self.doc.remove_child(parent, id);
                }
            }
            if !boundary {
                stack.extend(self.doc.children(id).iter().copied());
            }
        }
    }
}

/// Whether the built-in applier for `binding` writes attribute `attr`.
fn writes_attribute(binding: &str, attr: &str) -> bool {
    let mut segments = binding.split('.');
    match (segments.next(), segments.next()) {
        (Some("style"), Some(_)) => attr == "style",
        (Some("class"), Some(_)) | (Some("classname"), None) => attr == "class",
        (Some("attr" | "attribute"), Some(name)) => attr == name,
        (Some("innerhtml"), None) => false,
        (Some(name), _) => attr == name,
        (None, _) => false,
    }
}
