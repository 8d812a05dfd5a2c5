//! Virtual nodes, positional diffing and the in-memory host tree.

pub mod diff;
pub mod document;
pub mod error;
pub mod event;
pub mod html;

use trellis_core::Params;

pub use diff::{AttrPatch, Step, diff_attrs, plan};
pub use document::{Document, NodeId, NodeKind};
pub use error::DirectiveError;
pub use event::{Callback, Event, ListenerId, callback};

/// Where a virtual node came from: its source node plus the positions of
/// every `#for` expansion it sits inside.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub source: NodeId,
    pub iteration: Vec<usize>,
}

impl NodeKey {
    pub fn new(source: NodeId, iteration: &[usize]) -> Self {
        Self {
            source,
            iteration: iteration.to_vec(),
        }
    }
}

/// `[name]="expression"`, brackets stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub expression: String,
}

impl Binding {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
        }
    }

    /// Dotted selector segments: `style.width.px` -> `["style", "width", "px"]`.
    pub fn segments(&self) -> Vec<&str> {
        self.name.split('.').collect()
    }
}

/// `(name.modifier)="expression"`, parentheses stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub name: String,
    pub modifiers: Vec<String>,
    pub expression: String,
}

impl EventBinding {
    pub fn parse(raw: &str, expression: impl Into<String>) -> Self {
        let mut parts = raw.split('.');
        let name = parts.next().unwrap_or_default().to_string();
        Self {
            name,
            modifiers: parts.map(str::to_string).collect(),
            expression: expression.into(),
        }
    }

    pub fn has(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VText {
    pub content: String,
    /// Set when this is the stand-in for a hidden `#if` element.
    pub mask: Option<NodeKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VElement {
    pub tag: String,
    pub static_attrs: Vec<(String, String)>,
    pub custom_attrs: Vec<Binding>,
    pub custom_events: Vec<EventBinding>,
    pub children: Vec<VNode>,
    /// Source node of a nested component element; its children are not built.
    pub opaque: Option<NodeId>,
    pub key: Option<NodeKey>,
    /// Pre-order position within one built tree.
    pub serial: usize,
    /// Loop bindings and dataset entries visible to this element's directives.
    pub params: Params,
}

impl VElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            static_attrs: Vec::new(),
            custom_attrs: Vec::new(),
            custom_events: Vec::new(),
            children: Vec::new(),
            opaque: None,
            key: None,
            serial: 0,
            params: Params::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_attrs.push((name.into(), value.into()));
        self
    }

    pub fn bind(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.custom_attrs.push(Binding::new(name, expression));
        self
    }

    pub fn on(mut self, raw: &str, expression: impl Into<String>) -> Self {
        self.custom_events.push(EventBinding::parse(raw, expression));
        self
    }

    pub fn child(mut self, node: VNode) -> Self {
        self.children.push(node);
        self
    }

    pub fn is_boundary(&self) -> bool {
        self.opaque.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VNode {
    Text(VText),
    Element(VElement),
    Fragment(Vec<VNode>),
}

impl VNode {
    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Text(_) => &[],
            VNode::Element(el) => &el.children,
            VNode::Fragment(children) => children,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            VNode::Element(el) => Some(el.tag.as_str()),
            _ => None,
        }
    }

    /// Nodes in this tree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children().iter().map(VNode::count).sum::<usize>()
    }
}

impl From<VElement> for VNode {
    fn from(el: VElement) -> Self {
        VNode::Element(el)
    }
}

pub fn h(tag: impl Into<String>, attrs: Vec<(&str, &str)>, children: Vec<VNode>) -> VNode {
    let mut el = VElement::new(tag);
    el.static_attrs = attrs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    el.children = children;
    VNode::Element(el)
}

pub fn text(t: impl Into<String>) -> VNode {
    VNode::Text(VText {
        content: t.into(),
        mask: None,
    })
}

/// `changed(a, b)`: the kind differs, the tag differs, or both are text
/// with different content.
pub fn changed(a: &VNode, b: &VNode) -> bool {
    match (a, b) {
        (VNode::Text(x), VNode::Text(y)) => x.content != y.content,
        (VNode::Element(x), VNode::Element(y)) => x.tag != y.tag,
        (VNode::Fragment(_), VNode::Fragment(_)) => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_tree() {
        let node = h(
            "div",
            vec![("class", "app")],
            vec![text("hello"), h("span", vec![], vec![text("world")])],
        );
        if let VNode::Element(el) = &node {
            assert_eq!(el.tag, "div");
            assert_eq!(el.static_attrs, vec![("class".to_string(), "app".to_string())]);
            assert_eq!(el.children.len(), 2);
        } else {
            panic!("expected element");
        }
        assert_eq!(node.count(), 4);
    }

    #[test]
    fn text_changes_only_on_content() {
        assert!(!changed(&text("a"), &text("a")));
        assert!(changed(&text("a"), &text("b")));
        assert!(changed(&text(""), &h("p", vec![], vec![])));
        assert!(!changed(&h("p", vec![("a", "1")], vec![]), &h("p", vec![], vec![text("x")])));
        assert!(changed(&h("p", vec![], vec![]), &h("div", vec![], vec![])));
    }

    #[test]
    fn event_binding_splits_modifiers() {
        let ev = EventBinding::parse("click.prevent.once", "go()");
        assert_eq!(ev.name, "click");
        assert!(ev.has("prevent") && ev.has("once") && !ev.has("stop"));
    }
}
