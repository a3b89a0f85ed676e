//! Error types.
//!
//! Errors fall into four groups:
//!
//! - [`BuildError`]: raised while deriving an [`ArgsDef`](crate::ArgsDef),
//!   binding a function to it, or registering a command. Never deferred to
//!   call time.
//! - [`ConvertError`]: the low-level cause of a failed string/JSON/value
//!   conversion. Surfaced wrapped in [`Error::Convert`] together with the
//!   name of the offending argument.
//! - [`CallError`]: the error returned by the bound function itself.
//! - [`Error`]: everything an invocation can return.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Errors detected while building argument descriptors, dispatchers or
/// command tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(
        "{outer} declares {num_fields} arguments, but function {signature} has {num_params} matchable parameters"
    )]
    ArgCountMismatch {
        outer: String,
        num_fields: usize,
        signature: String,
        num_params: usize,
    },

    #[error(
        "argument {field:?} of {outer} has type {field_type}, but parameter {index} of function {signature} has type {param_type}"
    )]
    ArgTypeMismatch {
        outer: String,
        field: String,
        field_type: String,
        index: usize,
        signature: String,
        param_type: String,
    },

    #[error("{outer} declares argument {name:?} more than once")]
    DuplicateArgName { outer: String, name: String },

    #[error("argument {name:?} of {outer} does not resolve to a field of type {field_type}")]
    InvalidFieldPath {
        outer: String,
        name: String,
        field_type: String,
    },

    #[error("invalid command name {name:?}: {reason}")]
    InvalidCommandName { name: String, reason: String },

    #[error("command {name:?} is already registered")]
    DuplicateCommand { name: String },
}

/// Why a single value could not be converted into its destination type.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("can't parse {input:?} as {type_name}: {message}")]
    Parse {
        input: String,
        type_name: String,
        message: String,
    },

    #[error("can't parse {input:?} as {type_name}, tried formats: {}", formats.join(", "))]
    Time {
        input: String,
        type_name: String,
        formats: Vec<&'static str>,
    },

    #[error("slice value {0:?} does not begin with '['")]
    MissingOpenBracket(String),

    #[error("slice value {0:?} does not end with ']'")]
    MissingCloseBracket(String),

    #[error("slice value {input:?} has too many '{symbol}'")]
    Unbalanced { input: String, symbol: char },

    #[error("array value {input:?} needs {expected} elements, but has {actual}")]
    ArrayLength {
        input: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a value of type {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("{0}")]
    Custom(String),
}

impl ConvertError {
    /// Creates a custom conversion error with the given message.
    pub fn custom(message: impl fmt::Display) -> Self {
        ConvertError::Custom(message.to_string())
    }
}

/// The error returned by a bound function.
///
/// Shared behind an `Arc` so that the same error can be handed to every
/// result handler and then returned to the caller. Handlers that pass the
/// call error through unchanged are recognized by pointer identity and not
/// reported twice.
#[derive(Clone)]
pub struct CallError(Arc<anyhow::Error>);

impl CallError {
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        CallError(Arc::new(err.into()))
    }

    /// Returns true if both values share the same underlying error.
    pub fn ptr_eq(&self, other: &CallError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }

    /// Attempts to downcast the underlying error to a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for CallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&**self.0)
    }
}

/// Errors returned when invoking a bound function or dispatching a command.
#[derive(Debug, Error)]
pub enum Error {
    #[error("can't convert argument {arg:?}: {source}")]
    Convert {
        arg: String,
        #[source]
        source: ConvertError,
    },

    #[error("invalid JSON arguments: {input:?}")]
    InvalidJson { input: String },

    #[error("malformed JSON arguments: {0}")]
    Json(#[from] serde_json::Error),

    #[error("function {signature} expects {expected} argument values, got {actual}")]
    ValueCount {
        signature: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Call(CallError),

    #[error("result handler failed: {0}")]
    Handler(#[source] anyhow::Error),

    #[error("command not found: {command:?}")]
    CommandNotFound { command: String },

    #[error("super command not found: {command:?}")]
    SuperCommandNotFound { command: String },
}

impl Error {
    pub(crate) fn convert(arg: impl Into<String>, source: ConvertError) -> Self {
        Error::Convert {
            arg: arg.into(),
            source,
        }
    }

    /// Wraps any error raised by a result handler.
    pub fn handler(err: impl Into<anyhow::Error>) -> Self {
        Error::Handler(err.into())
    }

    /// Returns true for unknown command or super command names.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::CommandNotFound { .. } | Error::SuperCommandNotFound { .. }
        )
    }

    /// Returns the bound function's error, if this is one.
    pub fn as_call_error(&self) -> Option<&CallError> {
        match self {
            Error::Call(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true if this error is exactly the given call error.
    pub fn is_call_error(&self, call_error: Option<&CallError>) -> bool {
        match (self.as_call_error(), call_error) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<CallError> for Error {
    fn from(err: CallError) -> Self {
        Error::Call(err)
    }
}
