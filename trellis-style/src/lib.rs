//! Inline style and class-list editing on [`Document`] elements, plus a
//! small selector engine for element queries.

pub mod selector;

use indexmap::IndexMap;
use trellis_dom::{Document, NodeId};

pub use selector::{Selector, SelectorError, query_selector, query_selector_all};

/// Ordered `property: value` declarations of a `style` attribute.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InlineStyle {
    decls: IndexMap<String, String>,
}

impl InlineStyle {
    pub fn parse(css: &str) -> Self {
        let mut decls = IndexMap::new();
        for decl in css.split(';') {
            let decl = decl.trim();
            if decl.is_empty() {
                continue;
            }
            if let Some((k, v)) = decl.split_once(':') {
                decls.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
        InlineStyle { decls }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.decls.get(property).map(String::as_str)
    }

    /// Sets `property`, or removes it when `value` is empty.
    pub fn set(&mut self, property: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.decls.shift_remove(property);
        } else {
            self.decls.insert(property.to_string(), value.to_string());
        }
    }

    pub fn remove(&mut self, property: &str) -> Option<String> {
        self.decls.shift_remove(property)
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }
}

impl std::fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (k, v)) in self.decls.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{k}: {v};")?;
        }
        Ok(())
    }
}

pub fn inline_style(doc: &Document, id: NodeId) -> InlineStyle {
    InlineStyle::parse(doc.attribute(id, "style").unwrap_or(""))
}

/// Sets one inline property of an element; `None` removes it. The `style`
/// attribute is dropped once no declarations remain.
pub fn set_style(doc: &mut Document, id: NodeId, property: &str, value: Option<&str>) {
    let mut style = inline_style(doc, id);
    match value {
        Some(v) => style.set(property, v),
        None => {
            style.remove(property);
        }
    }
    if style.is_empty() {
        doc.remove_attribute(id, "style");
    } else {
        let serialized = style.to_string();
        if doc.attribute(id, "style") != Some(serialized.as_str()) {
            doc.set_attribute(id, "style", serialized);
        }
    }
}

pub fn class_list(doc: &Document, id: NodeId) -> Vec<String> {
    doc.attribute(id, "class")
        .unwrap_or("")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

pub fn has_class(doc: &Document, id: NodeId, class: &str) -> bool {
    doc.attribute(id, "class")
        .is_some_and(|c| c.split_whitespace().any(|x| x == class))
}

/// Adds or removes one class; returns whether the list changed.
pub fn toggle_class(doc: &mut Document, id: NodeId, class: &str, on: bool) -> bool {
    let mut classes = class_list(doc, id);
    let present = classes.iter().any(|c| c == class);
    if present == on {
        return false;
    }
    if on {
        classes.push(class.to_string());
    } else {
        classes.retain(|c| c != class);
    }
    doc.set_attribute(id, "class", classes.join(" "));
    true
}

/// Replaces the whole class attribute.
pub fn set_class_name(doc: &mut Document, id: NodeId, value: &str) {
    if doc.attribute(id, "class") != Some(value) {
        doc.set_attribute(id, "class", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_declaration_order() {
        let mut style = InlineStyle::parse("color: red; width:10px;;");
        assert_eq!(style.len(), 2);
        style.set("color", "blue");
        style.set("height", "2em");
        assert_eq!(style.to_string(), "color: blue; width: 10px; height: 2em;");
        style.set("width", "");
        assert_eq!(style.get("width"), None);
    }
}
