use pest::Parser;

use crate::ast::Attribute;
use crate::error::MarkupError;
use crate::parse::{MarkupParser, Rule, attribute, syntax_error};

/// The pieces of a component file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentSource {
    /// Raw markup between `<template>` and its closing tag.
    pub template: String,
    pub template_attrs: Vec<Attribute>,
    /// Bodies of the top-level `<style>` blocks, in order.
    pub styles: Vec<String>,
}

/// Splits a component file into its template and style blocks.
pub fn parse_component(source: &str) -> Result<ComponentSource, MarkupError> {
    let pairs = MarkupParser::parse(Rule::component, source).map_err(syntax_error)?;
    let mut out = ComponentSource::default();
    let mut found = false;

    for block in pairs.flat_map(|root| root.into_inner()) {
        match block.as_rule() {
            Rule::template_block => {
                found = true;
                for part in block.into_inner() {
                    match part.as_rule() {
                        Rule::attribute => out.template_attrs.push(attribute(part)),
                        Rule::template_body => out.template = part.as_str().to_string(),
                        _ => {}
                    }
                }
            }
            Rule::style_element => {
                for part in block.into_inner() {
                    if part.as_rule() == Rule::style_body {
                        out.styles.push(part.as_str().trim().to_string());
                    }
                }
            }
            _ => {}
        }
    }

    if !found {
        return Err(MarkupError::MissingTemplate);
    }
    Ok(out)
}

/// Whether `source` looks like a component file rather than bare markup.
pub fn is_component(source: &str) -> bool {
    let head = source.trim_start();
    let starts = |prefix: &str| {
        head.get(..prefix.len())
            .is_some_and(|h| h.eq_ignore_ascii_case(prefix))
    };
    starts("<template") || starts("<style")
}
