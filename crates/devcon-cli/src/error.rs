//! Error types surfaced by evaluation and by the shell.

use devcon_parse::SyntaxError;
use thiserror::Error;

use crate::value::Value;

pub type EvalResult<T> = Result<T, EvalError>;

/// Runtime failure raised while evaluating a program.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("unbound name `{0}`")]
    UnboundName(String),

    #[error("`{callee}` expects {expected} argument(s), got {found}")]
    Arity {
        callee: String,
        expected: String,
        found: usize,
    },

    #[error("value of kind {0} is not callable")]
    NotCallable(&'static str),

    #[error("{0}")]
    HostResolution(String),

    #[error("{0}")]
    HostInvocation(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error("call depth limit of {0} exceeded")]
    CallDepthExceeded(u32),

    /// Raised by `throw`; the value reaches `tryCatch` handlers untouched.
    #[error("uncaught {}", .0.repr())]
    Thrown(Value),
}

impl EvalError {
    /// Stable error-kind name handed to `tryCatch` handlers.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::UnboundName(_) => "UnboundNameError",
            EvalError::Arity { .. } => "ArityError",
            EvalError::NotCallable(_) => "NotCallableError",
            EvalError::HostResolution(_) => "HostResolutionError",
            EvalError::HostInvocation(_) => "HostInvocationError",
            EvalError::Type(_) => "TypeError",
            EvalError::Arithmetic(_) => "ArithmeticError",
            EvalError::CallDepthExceeded(_) => "CallDepthError",
            EvalError::Thrown(_) => "ThrownError",
        }
    }

    pub(crate) fn type_err(msg: impl Into<String>) -> Self {
        EvalError::Type(msg.into())
    }
}

/// Everything `Shell::eval` can fail with.
#[derive(Debug, Error)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("{}: {}", .0.kind(), .0)]
    Eval(#[from] EvalError),

    #[error("source is {size} bytes, limit is {limit}")]
    SourceTooLarge { limit: usize, size: usize },
}

impl Error {
    pub fn as_eval(&self) -> Option<&EvalError> {
        match self {
            Error::Eval(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Syntax(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_distinct() {
        let errs = [
            EvalError::UnboundName("x".into()),
            EvalError::Arity {
                callee: "f".into(),
                expected: "1".into(),
                found: 2,
            },
            EvalError::NotCallable("int"),
            EvalError::HostResolution("r".into()),
            EvalError::HostInvocation("i".into()),
            EvalError::Type("t".into()),
            EvalError::Arithmetic("a".into()),
            EvalError::CallDepthExceeded(3),
            EvalError::Thrown(Value::Null),
        ];
        let mut kinds: Vec<_> = errs.iter().map(EvalError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errs.len());
    }

    #[test]
    fn shell_error_display_prefixes_kind() {
        let e = Error::from(EvalError::UnboundName("nope".into()));
        assert_eq!(e.to_string(), "UnboundNameError: unbound name `nope`");
    }
}
