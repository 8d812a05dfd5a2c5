use std::str::FromStr;

use thiserror::Error;
use trellis_dom::{Document, NodeId};

use crate::has_class;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid selector `{selector}`: {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

/// `tag.class#id[attr=value]`; every present part must match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else {
            return false;
        };
        self.tag.as_deref().is_none_or(|t| t == tag)
            && self
                .id
                .as_deref()
                .is_none_or(|id| doc.attribute(node, "id") == Some(id))
            && self.classes.iter().all(|c| has_class(doc, node, c))
            && self.attrs.iter().all(|(name, value)| match value {
                Some(v) => doc.attribute(node, name) == Some(v.as_str()),
                None => doc.has_attribute(node, name),
            })
    }
}

/// Comma-separated alternatives of descendant chains, e.g. `ul li.active, #main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Vec<Compound>>,
}

impl Selector {
    pub fn parse(src: &str) -> Result<Self, SelectorError> {
        let fail = |reason: &str| SelectorError {
            selector: src.to_string(),
            reason: reason.to_string(),
        };
        let mut alternatives = Vec::new();
        for group in src.split(',') {
            let chain = group
                .split_whitespace()
                .map(|part| parse_compound(part).map_err(|r| fail(&r)))
                .collect::<Result<Vec<_>, _>>()?;
            if chain.is_empty() {
                return Err(fail("empty selector"));
            }
            alternatives.push(chain);
        }
        Ok(Selector { alternatives })
    }

    /// Whether `node` matches, only looking at ancestors strictly below `scope`.
    pub fn matches(&self, doc: &Document, node: NodeId, scope: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|chain| chain_matches(chain, doc, node, scope))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

fn chain_matches(chain: &[Compound], doc: &Document, node: NodeId, scope: NodeId) -> bool {
    let Some((last, rest)) = chain.split_last() else {
        return false;
    };
    if !last.matches(doc, node) {
        return false;
    }
    let mut remaining = rest.iter().rev().peekable();
    let mut current = doc.parent(node);
    while let Some(compound) = remaining.peek() {
        match current {
            Some(ancestor) if ancestor != scope => {
                if compound.matches(doc, ancestor) {
                    remaining.next();
                }
                current = doc.parent(ancestor);
            }
            _ => return false,
        }
    }
    true
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(part: &str) -> Result<Compound, String> {
    let mut compound = Compound::default();
    let mut chars = part.char_indices().peekable();
    let take_name = |chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>| {
        let mut name = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if !is_name_char(c) {
                break;
            }
            name.push(c);
            chars.next();
        }
        name
    };

    while let Some(&(_, c)) = chars.peek() {
        match c {
            '*' => {
                chars.next();
            }
            '.' | '#' => {
                chars.next();
                let name = take_name(&mut chars);
                if name.is_empty() {
                    return Err(format!("expected a name after `{c}`"));
                }
                if c == '.' {
                    compound.classes.push(name);
                } else {
                    compound.id = Some(name);
                }
            }
            '[' => {
                chars.next();
                let mut body = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    body.push(c);
                }
                if !closed {
                    return Err("unterminated attribute selector".to_string());
                }
                let attr = match body.split_once('=') {
                    Some((name, value)) => (
                        name.trim().to_ascii_lowercase(),
                        Some(value.trim().trim_matches(['"', '\'']).to_string()),
                    ),
                    None => (body.trim().to_ascii_lowercase(), None),
                };
                compound.attrs.push(attr);
            }
            c if is_name_char(c) && compound == Compound::default() => {
                compound.tag = Some(take_name(&mut chars).to_ascii_lowercase());
            }
            other => return Err(format!("unexpected `{other}`")),
        }
    }
    Ok(compound)
}

/// First element below `scope` matching `selector`, in document order.
pub fn query_selector(doc: &Document, scope: NodeId, selector: &Selector) -> Option<NodeId> {
    doc.descendants(scope)
        .into_iter()
        .find(|&n| selector.matches(doc, n, scope))
}

pub fn query_selector_all(doc: &Document, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
    doc.descendants(scope)
        .into_iter()
        .filter(|&n| selector.matches(doc, n, scope))
        .collect()
}
