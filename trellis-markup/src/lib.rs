//! Markup front end: a pest grammar for templates with directive
//! attributes, and component-file splitting.

pub mod ast;
pub mod component;
pub mod error;
pub mod parse;

pub use ast::{AttrKind, Attribute, Element, Node, VOID_ELEMENTS, classify, is_void};
pub use component::{ComponentSource, is_component, parse_component};
pub use error::MarkupError;
pub use parse::{decode_entities, parse_fragment};
