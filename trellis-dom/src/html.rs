use trellis_markup::is_void;

use crate::document::{Document, NodeKind};
use crate::NodeId;

pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

fn is_raw_text(tag: &str) -> bool {
    matches!(tag, "style" | "script")
}

impl Document {
    /// Serialized children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self.tag(id).is_some_and(is_raw_text);
        for &child in self.children(id) {
            write_node(self, child, raw, &mut out);
        }
        out
    }

    /// Serialized `id` including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        write_node(self, id, false, &mut out);
        out
    }

    /// Like [`Document::inner_html`] with one node per line, indented.
    pub fn pretty_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            write_pretty(self, child, 0, &mut out);
        }
        out
    }
}

fn open_tag(doc: &Document, id: NodeId, tag: &str, out: &mut String) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in doc.attributes(id) {
        out.push(' ');
        out.push_str(name);
        if !value.is_empty() {
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
    }
    out.push('>');
}

fn write_node(doc: &Document, id: NodeId, raw: bool, out: &mut String) {
    match doc.kind(id) {
        NodeKind::Text(t) if raw => out.push_str(t),
        NodeKind::Text(t) => out.push_str(&escape_text(t)),
        NodeKind::Comment(c) => {
            out.push_str("<!--");
            out.push_str(c);
            out.push_str("-->");
        }
        NodeKind::Fragment => {
            for &child in doc.children(id) {
                write_node(doc, child, raw, out);
            }
        }
        NodeKind::Element(tag) => {
            open_tag(doc, id, tag, out);
            if is_void(tag) {
                return;
            }
            out.push_str(&doc.inner_html(id));
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn write_pretty(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match doc.kind(id) {
        NodeKind::Text(t) => {
            let t = t.trim();
            if !t.is_empty() {
                out.push_str(&indent);
                out.push_str(&escape_text(t));
                out.push('\n');
            }
        }
        NodeKind::Element(tag) if !is_void(tag) && !is_raw_text(tag) => {
            let inline = doc
                .children(id)
                .iter()
                .all(|&c| matches!(doc.kind(c), NodeKind::Text(_)));
            out.push_str(&indent);
            open_tag(doc, id, tag, out);
            if inline {
                out.push_str(doc.inner_html(id).trim());
            } else {
                out.push('\n');
                for &child in doc.children(id) {
                    write_pretty(doc, child, depth + 1, out);
                }
                out.push_str(&indent);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push_str(">\n");
        }
        _ => {
            out.push_str(&indent);
            write_node(doc, id, false, out);
            out.push('\n');
        }
    }
}
