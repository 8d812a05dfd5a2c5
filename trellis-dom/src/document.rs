use indexmap::IndexMap;
use tracing::{trace, warn};
use trellis_core::{Params, Value};
use trellis_markup::{MarkupError, Node, parse_fragment};

use crate::error::DirectiveError;
use crate::event::{Callback, Event, Listener, ListenerId};

/// Stable handle to a node of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Fragment,
    Element(String),
    Text(String),
    Comment(String),
}

#[derive(Debug)]
struct Slot {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attrs: IndexMap<String, String>,
    props: IndexMap<String, Value>,
    listeners: Vec<Listener>,
}

impl Slot {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attrs: IndexMap::new(),
            props: IndexMap::new(),
            listeners: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropKind {
    /// Mirrors a string attribute.
    Reflect,
    /// Mirrors the presence of an attribute.
    Flag,
    /// Lives only on the element.
    Stored,
    TextContent,
}

fn property_kind(name: &str) -> Option<PropKind> {
    match name {
        "id" | "title" | "lang" | "dir" | "tabindex" | "href" | "src" | "alt" | "placeholder"
        | "name" | "type" => Some(PropKind::Reflect),
        "hidden" | "disabled" | "readonly" | "required" => Some(PropKind::Flag),
        "value" | "checked" | "selected" => Some(PropKind::Stored),
        "textcontent" => Some(PropKind::TextContent),
        _ => None,
    }
}

/// In-memory element tree: the host the reconciler patches.
///
/// Nodes live in an arena and are never freed; detached nodes keep their
/// id so masks and nested component elements can be re-attached later.
#[derive(Debug)]
pub struct Document {
    slots: Vec<Slot>,
    root: NodeId,
    next_listener: u64,
    mutations: u64,
    navigations: Vec<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::new(NodeKind::Fragment)],
            root: NodeId(0),
            next_listener: 0,
            mutations: 0,
            navigations: Vec::new(),
        }
    }

    /// A document whose root holds the parsed `markup`.
    pub fn from_markup(markup: &str) -> Result<Self, MarkupError> {
        let mut doc = Self::new();
        let nodes = parse_fragment(markup)?;
        let root = doc.root;
        doc.append_markup(root, &nodes);
        doc.mutations = 0;
        Ok(doc)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.0]
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
        &mut self.slots[id.0]
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.slots.push(Slot::new(kind));
        NodeId(self.slots.len() - 1)
    }

    fn touch(&mut self) {
        self.mutations += 1;
    }

    /// Count of changes made to attached or detached nodes so far.
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Element(tag.into()))
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(content.into()))
    }

    pub fn create_comment(&mut self, content: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Comment(content.into()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeKind::Fragment)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.slot(id).kind
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.slot(id).kind {
            NodeKind::Element(tag) => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.slot(id).kind, NodeKind::Element(_))
    }

    /// Content of a text or comment node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.slot(id).kind {
            NodeKind::Text(s) | NodeKind::Comment(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, content: impl Into<String>) {
        if let NodeKind::Text(s) | NodeKind::Comment(s) = &mut self.slot_mut(id).kind {
            *s = content.into();
            self.touch();
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slot(id).children
    }

    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.slot(id).children.get(index).copied()
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// `id` followed by its ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        let mut current = self.parent(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    /// Every node below `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.slot_mut(child).parent.take() {
            self.slot_mut(parent).children.retain(|&c| c != child);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.slot_mut(child).parent = Some(parent);
        self.slot_mut(parent).children.push(child);
        trace!(parent = parent.0, child = child.0, "append");
        self.touch();
    }

    /// Inserts before `reference`, or appends when it is `None` or not a child.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        self.detach(child);
        self.slot_mut(child).parent = Some(parent);
        let children = &mut self.slot_mut(parent).children;
        match reference.and_then(|r| children.iter().position(|&c| c == r)) {
            Some(pos) => children.insert(pos, child),
            None => children.push(child),
        }
        self.touch();
    }

    /// Puts `new` in the place of `old`; returns false when `old` is not a child.
    pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> bool {
        if new == old {
            return true;
        }
        if self.parent(old) != Some(parent) {
            return false;
        }
        self.detach(new);
        let children = &mut self.slot_mut(parent).children;
        let Some(pos) = children.iter().position(|&c| c == old) else {
            return false;
        };
        children[pos] = new;
        self.slot_mut(old).parent = None;
        self.slot_mut(new).parent = Some(parent);
        trace!(parent = parent.0, new = new.0, old = old.0, "replace");
        self.touch();
        true
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        self.detach(child);
        self.touch();
        true
    }

    /// Drops every listener in the subtree rooted at `id`.
    pub fn release(&mut self, id: NodeId) {
        let mut nodes = self.descendants(id);
        nodes.push(id);
        for node in nodes {
            self.clear_listeners(node);
        }
    }

    /// Drops the listeners of `id` only, leaving its children alone.
    pub fn clear_listeners(&mut self, id: NodeId) -> usize {
        let listeners = std::mem::take(&mut self.slot_mut(id).listeners);
        listeners.len()
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.slot(id).attrs.get(name).map(String::as_str)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.slot(id).attrs.contains_key(name)
    }

    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.slot(id)
            .attrs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        if !self.is_element(id) {
            warn!(node = id.0, "attribute write on a non-element ignored");
            return;
        }
        let name = name.into();
        let value = value.into();
        trace!(node = id.0, %name, %value, "set attribute");
        self.slot_mut(id).attrs.insert(name, value);
        self.touch();
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        let removed = self.slot_mut(id).attrs.shift_remove(name).is_some();
        if removed {
            trace!(node = id.0, name, "remove attribute");
            self.touch();
        }
        removed
    }

    /// Whether the element exposes a settable field called `name`.
    pub fn has_property(&self, id: NodeId, name: &str) -> bool {
        self.is_element(id) && property_kind(name).is_some()
    }

    pub fn property(&self, id: NodeId, name: &str) -> Option<Value> {
        if !self.is_element(id) {
            return None;
        }
        let slot = self.slot(id);
        match property_kind(name)? {
            PropKind::Reflect => Some(Value::from(
                slot.attrs.get(name).map(String::as_str).unwrap_or(""),
            )),
            PropKind::Flag => Some(Value::Bool(slot.attrs.contains_key(name))),
            PropKind::Stored => Some(match slot.props.get(name) {
                Some(v) => v.clone(),
                None if name == "value" => {
                    Value::from(slot.attrs.get(name).map(String::as_str).unwrap_or(""))
                }
                None => Value::Bool(slot.attrs.contains_key(name)),
            }),
            PropKind::TextContent => Some(Value::from(self.text_content(id))),
        }
    }

    /// Writes a known element field; returns false when `name` is not one.
    pub fn set_property(&mut self, id: NodeId, name: &str, value: Value) -> bool {
        if !self.is_element(id) {
            warn!(node = id.0, name, "property write on a non-element ignored");
            return false;
        }
        let Some(kind) = property_kind(name) else {
            return false;
        };
        match kind {
            PropKind::Reflect => {
                if value.is_nullish() {
                    self.remove_attribute(id, name);
                } else {
                    self.set_attribute(id, name, value.to_display_string());
                }
            }
            PropKind::Flag => {
                if value.is_truthy() {
                    self.set_attribute(id, name, "");
                } else {
                    self.remove_attribute(id, name);
                }
            }
            PropKind::Stored => {
                let value = match name {
                    "value" => Value::from(value.to_display_string()),
                    _ => Value::Bool(value.is_truthy()),
                };
                self.slot_mut(id).props.insert(name.to_string(), value);
                self.touch();
            }
            PropKind::TextContent => {
                let content = if value.is_nullish() {
                    String::new()
                } else {
                    value.to_display_string()
                };
                self.set_text_content(id, content);
            }
        }
        true
    }

    pub fn text_content(&self, id: NodeId) -> String {
        match &self.slot(id).kind {
            NodeKind::Text(s) | NodeKind::Comment(s) => s.clone(),
            _ => self
                .descendants(id)
                .into_iter()
                .filter_map(|n| match &self.slot(n).kind {
                    NodeKind::Text(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    pub fn set_text_content(&mut self, id: NodeId, content: impl Into<String>) {
        let content = content.into();
        if let NodeKind::Text(_) | NodeKind::Comment(_) = self.slot(id).kind {
            self.set_text(id, content);
            return;
        }
        self.clear_children(id);
        if !content.is_empty() {
            let text = self.create_text(content);
            self.append_child(id, text);
        }
    }

    fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.slot_mut(id).children);
        for child in children {
            self.release(child);
            self.slot_mut(child).parent = None;
        }
        self.touch();
    }

    /// Replaces the children of `id` with parsed markup, unescaped.
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) -> Result<(), MarkupError> {
        let nodes = parse_fragment(markup)?;
        self.clear_children(id);
        self.append_markup(id, &nodes);
        Ok(())
    }

    pub fn append_markup(&mut self, parent: NodeId, nodes: &[Node]) {
        for node in nodes {
            let id = match node {
                Node::Text(t) => self.create_text(t.as_str()),
                Node::Comment(c) => self.create_comment(c.as_str()),
                Node::Element(el) => {
                    let id = self.create_element(el.tag.as_str());
                    let slot = self.slot_mut(id);
                    for attr in &el.attrs {
                        slot.attrs.insert(attr.name.clone(), attr.value.clone());
                    }
                    self.append_markup(id, &el.children);
                    id
                }
            };
            self.append_child(parent, id);
        }
    }

    /// Deep-copies a subtree of `other` into this document, detached.
    pub fn import(&mut self, other: &Document, id: NodeId) -> NodeId {
        let src = other.slot(id);
        let copy = self.alloc(src.kind.clone());
        {
            let slot = self.slot_mut(copy);
            slot.attrs = src.attrs.clone();
            slot.props = src.props.clone();
        }
        for &child in &src.children {
            let c = self.import(other, child);
            self.slot_mut(c).parent = Some(copy);
            self.slot_mut(copy).children.push(c);
        }
        copy
    }

    /// `data-*` attributes as camelCase parameters.
    pub fn dataset(&self, id: NodeId) -> Params {
        self.slot(id)
            .attrs
            .iter()
            .filter_map(|(name, value)| {
                let key = name.strip_prefix("data-")?;
                Some((camel_case(key), Value::from(value.as_str())))
            })
            .collect()
    }

    pub fn add_listener(
        &mut self,
        id: NodeId,
        kind: impl Into<String>,
        once: bool,
        callback: Callback,
    ) -> ListenerId {
        let listener = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.slot_mut(id).listeners.push(Listener {
            id: listener,
            kind: kind.into(),
            once,
            callback,
        });
        listener
    }

    pub fn remove_listener(&mut self, id: NodeId, listener: ListenerId) -> bool {
        let listeners = &mut self.slot_mut(id).listeners;
        let before = listeners.len();
        listeners.retain(|l| l.id != listener);
        listeners.len() != before
    }

    pub fn has_listener(&self, id: NodeId, listener: ListenerId) -> bool {
        self.slot(id).listeners.iter().any(|l| l.id == listener)
    }

    pub fn listeners_on(&self, id: NodeId) -> usize {
        self.slot(id).listeners.len()
    }

    /// Listeners attached anywhere, connected or not.
    pub fn listener_count(&self) -> usize {
        self.slots.iter().map(|s| s.listeners.len()).sum()
    }

    /// Runs listeners from `target` up to the root, then the default action.
    pub fn dispatch(&mut self, target: NodeId, event: &mut Event) -> Result<(), DirectiveError> {
        let path = self.ancestors(target);
        for &node in &path {
            let matching: Vec<Listener> = self
                .slot(node)
                .listeners
                .iter()
                .filter(|l| l.kind == event.kind())
                .cloned()
                .collect();
            event.retarget(target, node);
            for listener in matching {
                if listener.once {
                    self.remove_listener(node, listener.id);
                }
                (listener.callback)(event)?;
            }
            if event.is_propagation_stopped() {
                break;
            }
        }

        if event.kind() == "click" && !event.is_default_prevented() {
            let href = path
                .iter()
                .find(|&&n| self.tag(n) == Some("a") && self.has_attribute(n, "href"))
                .and_then(|&n| self.attribute(n, "href"))
                .map(str::to_string);
            if let Some(href) = href {
                trace!(%href, "navigate");
                self.navigations.push(href);
            }
        }
        Ok(())
    }

    pub fn click(&mut self, target: NodeId) -> Result<Event, DirectiveError> {
        let mut event = Event::new("click");
        self.dispatch(target, &mut event)?;
        Ok(event)
    }

    /// Links followed by unprevented clicks, oldest first.
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }
}

fn camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper = false;
    for ch in s.chars() {
        if ch == '-' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_uses_camel_case() {
        let mut doc = Document::from_markup(r#"<li data-user-id="7" data-x="y" class="a"></li>"#).unwrap();
        let li = doc.child_at(doc.root(), 0).unwrap();
        let data = doc.dataset(li);
        assert_eq!(data.get("userId"), Some(&Value::from("7")));
        assert_eq!(data.get("x"), Some(&Value::from("y")));
        assert_eq!(data.len(), 2);
        doc.set_attribute(li, "data-z", "1");
        assert_eq!(doc.dataset(li).len(), 3);
    }

    #[test]
    fn flag_properties_toggle_attributes() {
        let mut doc = Document::new();
        let input = doc.create_element("input");
        assert!(doc.set_property(input, "disabled", Value::Bool(true)));
        assert_eq!(doc.attribute(input, "disabled"), Some(""));
        doc.set_property(input, "disabled", Value::Bool(false));
        assert!(!doc.has_attribute(input, "disabled"));

        doc.set_property(input, "value", Value::from(5));
        assert_eq!(doc.property(input, "value"), Some(Value::from("5")));
        assert!(!doc.has_attribute(input, "value"));
        assert!(!doc.set_property(input, "bogus", Value::Null));
    }
}
