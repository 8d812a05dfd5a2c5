use trellis_core::{EvalError, Value};
use trellis_dom::DirectiveError;

/// `#for="let item of items"`, split into its binding and iterable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForDirective {
    pub binding: String,
    pub iterable: String,
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn next_word(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    Some(s.split_at(s.find(char::is_whitespace).unwrap_or(s.len())))
}

/// Parses `(let|const|var) <ident> (in|of) <expression>`.
pub fn parse_for(value: &str, tag: &str) -> Result<ForDirective, DirectiveError> {
    let malformed = || DirectiveError::Malformed {
        directive: "#for".to_string(),
        value: value.to_string(),
        tag: tag.to_string(),
    };

    let (keyword, rest) = next_word(value).ok_or_else(malformed)?;
    let (binding, rest) = next_word(rest).ok_or_else(malformed)?;
    let (op, rest) = next_word(rest).ok_or_else(malformed)?;
    if !matches!(keyword, "let" | "const" | "var") || !is_identifier(binding) {
        return Err(malformed());
    }
    if !matches!(op, "in" | "of") {
        return Err(malformed());
    }
    let iterable = rest.trim();
    if iterable.is_empty() {
        return Err(malformed());
    }
    Ok(ForDirective {
        binding: binding.to_string(),
        iterable: iterable.to_string(),
    })
}

/// Checks an `#if` value before it is evaluated.
pub fn check_if<'a>(value: &'a str, tag: &str) -> Result<&'a str, DirectiveError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DirectiveError::Malformed {
            directive: "#if".to_string(),
            value: value.to_string(),
            tag: tag.to_string(),
        });
    }
    Ok(trimmed)
}

/// One step of a `#for` expansion.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Sequence element with its position.
    Item(usize, Value),
    /// Mapping entry: key and value.
    Prop(String, Value),
}

/// Entries of an iterable value, in enumeration order.
pub fn entries(iterable: &Value) -> Result<Vec<Entry>, EvalError> {
    match iterable {
        Value::Undefined | Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items
            .iter()
            .enumerate()
            .map(|(i, v)| Entry::Item(i, v.clone()))
            .collect()),
        Value::Object(obj) => Ok(obj
            .iter()
            .map(|(k, v)| Entry::Prop(k.clone(), v.clone()))
            .collect()),
        Value::Str(s) => Ok(s
            .chars()
            .enumerate()
            .map(|(i, c)| Entry::Item(i, Value::string(c.to_string())))
            .collect()),
        other => Err(EvalError::Type(format!("{} is not iterable", other.type_name()))),
    }
}
