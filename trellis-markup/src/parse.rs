use pest::Parser;
use pest::error::LineColLocation;
use pest::iterators::Pair;

use crate::ast::{Attribute, Element, Node, is_void};
use crate::error::MarkupError;

#[derive(pest_derive::Parser)]
#[grammar = "markup.pest"]
pub(crate) struct MarkupParser;

pub(crate) fn syntax_error(err: pest::error::Error<Rule>) -> MarkupError {
    let (line, column) = match err.line_col {
        LineColLocation::Pos(pos) | LineColLocation::Span(pos, _) => pos,
    };
    MarkupError::Syntax {
        line,
        column,
        message: err.variant.message().into_owned(),
    }
}

/// Parses a markup fragment into its top-level nodes.
///
/// Follows the lenient HTML habits templates rely on: tag and attribute
/// names are lowercased, void elements never take children, a stray close
/// tag is dropped and unclosed elements are closed at the end of input.
/// Whitespace-only text between top-level nodes is discarded.
pub fn parse_fragment(source: &str) -> Result<Vec<Node>, MarkupError> {
    let mut pairs = MarkupParser::parse(Rule::fragment, source).map_err(syntax_error)?;
    let Some(fragment) = pairs.next() else {
        return Ok(Vec::new());
    };

    let mut stack: Vec<Element> = Vec::new();
    let mut roots: Vec<Node> = Vec::new();

    for token in fragment.into_inner() {
        match token.as_rule() {
            Rule::open_tag => {
                let (element, self_closing) = open_tag(token);
                if self_closing || is_void(&element.tag) {
                    push_child(&mut stack, &mut roots, Node::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Rule::close_tag => {
                let tag = token
                    .into_inner()
                    .next()
                    .map(|p| p.as_str().to_ascii_lowercase())
                    .unwrap_or_default();
                if let Some(pos) = stack.iter().rposition(|e| e.tag == tag) {
                    close_until(&mut stack, &mut roots, pos);
                }
            }
            Rule::style_element | Rule::script_element | Rule::textarea_element => {
                let element = raw_element(token);
                push_child(&mut stack, &mut roots, Node::Element(element));
            }
            Rule::text => {
                push_child(&mut stack, &mut roots, Node::Text(decode_entities(token.as_str())));
            }
            Rule::comment => {
                let body = token
                    .into_inner()
                    .next()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                push_child(&mut stack, &mut roots, Node::Comment(body));
            }
            _ => {}
        }
    }

    close_until(&mut stack, &mut roots, 0);

    roots.retain(|n| match n {
        Node::Text(t) => !t.chars().all(char::is_whitespace),
        _ => true,
    });
    Ok(roots)
}

fn push_child(stack: &mut [Element], roots: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn close_until(stack: &mut Vec<Element>, roots: &mut Vec<Node>, depth: usize) {
    while stack.len() > depth {
        if let Some(element) = stack.pop() {
            push_child(stack, roots, Node::Element(element));
        }
    }
}

fn open_tag(pair: Pair<Rule>) -> (Element, bool) {
    let mut element = Element::new(String::new());
    let mut self_closing = false;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::tag_name => element.tag = part.as_str().to_ascii_lowercase(),
            Rule::attribute => element.attrs.push(attribute(part)),
            Rule::self_close => self_closing = true,
            _ => {}
        }
    }
    (element, self_closing)
}

fn raw_element(pair: Pair<Rule>) -> Element {
    let mut element = Element::new(String::new());
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::style_tag | Rule::script_tag | Rule::textarea_tag => {
                element.tag = part.as_str().to_ascii_lowercase();
            }
            Rule::attribute => element.attrs.push(attribute(part)),
            Rule::style_body | Rule::script_body => {
                if !part.as_str().is_empty() {
                    element.children.push(Node::Text(part.as_str().to_string()));
                }
            }
            Rule::textarea_body => {
                if !part.as_str().is_empty() {
                    element.children.push(Node::Text(decode_entities(part.as_str())));
                }
            }
            _ => {}
        }
    }
    element
}

pub(crate) fn attribute(pair: Pair<Rule>) -> Attribute {
    let mut attr = Attribute::new(String::new(), String::new());
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::attr_name => attr.name = part.as_str().to_ascii_lowercase(),
            Rule::dq_value | Rule::sq_value | Rule::bare_value => {
                attr.value = decode_entities(part.as_str());
            }
            _ => {}
        }
    }
    attr
}

/// Decodes the named entities templates commonly use plus numeric references.
/// Unknown entities are left as written.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| entity(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
