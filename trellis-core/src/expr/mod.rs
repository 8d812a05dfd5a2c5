//! Directive expressions: a small JavaScript-flavoured language parsed once
//! per literal text and interpreted against a parameter bag and a [`Scope`].

pub mod ast;
mod interp;
pub mod lexer;
pub mod parser;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::error::EvalError;
use crate::scope::{Params, Scope};
use crate::value::Value;
use ast::Program;
use interp::Interpreter;
pub use parser::{parse_block, parse_expression};

/// How an expression string is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// A single expression, optionally prefixed by `return`.
    Value,
    /// `;`-separated statements, as used by event handlers.
    Block,
}

/// Parses expressions on first use and caches the result by (shape, text).
#[derive(Debug, Default)]
pub struct Evaluator {
    cache: RefCell<HashMap<(Shape, String), Rc<Program>>>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(&self, shape: Shape, src: &str) -> Result<Rc<Program>, EvalError> {
        let key = (shape, src.to_string());
        if let Some(program) = self.cache.borrow().get(&key) {
            return Ok(program.clone());
        }
        let program = Rc::new(match shape {
            Shape::Value => parse_expression(src)?,
            Shape::Block => parse_block(src)?,
        });
        trace!(expression = src, ?shape, "compiled expression");
        self.cache.borrow_mut().insert(key, program.clone());
        Ok(program)
    }

    pub fn value(&self, src: &str, params: &Params, scope: &mut dyn Scope) -> Result<Value, EvalError> {
        let program = self.compile(Shape::Value, src)?;
        Interpreter::new(params, scope).run(&program)
    }

    pub fn block(&self, src: &str, params: &Params, scope: &mut dyn Scope) -> Result<Value, EvalError> {
        let program = self.compile(Shape::Block, src)?;
        Interpreter::new(params, scope).run(&program)
    }

    /// The guarded form used by `#if`: the value coerced to a boolean.
    pub fn condition(&self, src: &str, params: &Params, scope: &mut dyn Scope) -> Result<bool, EvalError> {
        Ok(self.value(src, params, scope)?.is_truthy())
    }

    /// Number of cached programs.
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}

/// One-shot evaluation of a value expression without caching.
pub fn evaluate(expression: &str, parameters: &Params, scope: &mut dyn Scope) -> Result<Value, EvalError> {
    let program = parse_expression(expression)?;
    Interpreter::new(parameters, scope).run(&program)
}
