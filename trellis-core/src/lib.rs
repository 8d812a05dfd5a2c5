//! Values, scopes and the directive expression language shared by the
//! trellis crates.

pub mod error;
pub mod expr;
pub mod scheduler;
pub mod scope;
pub mod value;

pub use error::EvalError;
pub use expr::{Evaluator, Shape, evaluate};
pub use scheduler::{PassGuard, RenderQueue, Ticket};
pub use scope::{Method, Params, Scope, State};
pub use value::{Object, Value};
