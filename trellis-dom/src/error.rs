use thiserror::Error;
use trellis_core::EvalError;
use trellis_markup::MarkupError;

/// Failure of a render pass or an event handler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DirectiveError {
    /// A bound expression failed to parse or run.
    #[error("{source} from \"<{tag}> {expression}\"")]
    Evaluation {
        expression: String,
        tag: String,
        #[source]
        source: EvalError,
    },

    /// A `#for`/`#if` value does not follow the directive grammar.
    #[error("malformed {directive} directive \"{value}\" on <{tag}>")]
    Malformed {
        directive: String,
        value: String,
        tag: String,
    },

    #[error(transparent)]
    Markup(#[from] MarkupError),
}

impl DirectiveError {
    pub fn evaluation(expression: impl Into<String>, tag: impl Into<String>, source: EvalError) -> Self {
        DirectiveError::Evaluation {
            expression: expression.into(),
            tag: tag.into(),
            source,
        }
    }
}
