/// How the engine treats an attribute, decided by its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind<'a> {
    /// `class="app"`, copied verbatim.
    Static,
    /// `[style.width.px]="expr"`; carries the selector between the brackets.
    Binding(&'a str),
    /// `(click.prevent)="expr"`; carries the event name and modifiers.
    Event(&'a str),
    /// `#if="expr"`
    If,
    /// `#for="let x of items"`
    For,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased, brackets and parentheses kept.
    pub name: String,
    /// Entity-decoded; empty for boolean attributes.
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn kind(&self) -> AttrKind<'_> {
        classify(&self.name)
    }
}

pub fn classify(name: &str) -> AttrKind<'_> {
    if name == "#if" {
        AttrKind::If
    } else if name == "#for" {
        AttrKind::For
    } else if let Some(inner) = name.strip_prefix('[').and_then(|n| n.strip_suffix(']')) {
        AttrKind::Binding(inner)
    } else if let Some(inner) = name.strip_prefix('(').and_then(|n| n.strip_suffix(')')) {
        AttrKind::Event(inner)
    } else {
        AttrKind::Static
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Lowercased tag name.
    pub tag: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

/// Elements that never have children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}
