use thiserror::Error;

/// Failure raised while parsing or running a directive expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("syntax error at {position}: {message}")]
    Syntax { message: String, position: usize },

    #[error("{0} is not defined")]
    UndefinedIdentifier(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("{0} is not a function")]
    NotCallable(String),

    #[error("cannot assign to read-only member {0}")]
    ReadOnly(String),

    #[error("{name}(): {message}")]
    Method { name: String, message: String },
}

impl EvalError {
    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        EvalError::Syntax {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type(message.into())
    }
}
