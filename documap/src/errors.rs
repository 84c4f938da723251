use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for documap operations.
///
/// Each kind describes one category of failure in the mapping layer. The
/// taxonomy is flat; the repository raises these directly and the safe
/// decorator uses [`ErrorKind::recoverable`] to decide what it may swallow.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// Malformed identifier string, rejected filter predicate, or malformed
    /// aggregation stage.
    InvalidQuery,
    /// A filter references a field not declared on the bound model.
    FieldDoesNotExist,
    /// A unique `get` found zero matches.
    DoesNotExist,
    /// A unique `get` found two or more matches.
    MultipleObjectsReturned,
    /// A single-document insert failed at the store.
    Write,
    /// The one-time index bootstrap for a collection failed.
    IndexCreation,
    /// A unique index constraint was violated at the store.
    UniqueViolation,
    /// An index declaration cannot be translated to a native spec.
    InvalidIndexSpec,
    /// A repository binding is missing its collection name.
    IncompleteBinding,
    /// A model could not be mapped to or from a document.
    ModelMapping,
    /// Internal error (usually indicates a bug).
    Internal,
}

impl ErrorKind {
    /// Whether the safe decorator is permitted to swallow this kind.
    ///
    /// Covers the runtime failures a caller can recover from by treating the
    /// operation as "no result". Programming errors (`ModelMapping`,
    /// `Internal`) and definition-time errors (`IncompleteBinding`,
    /// `InvalidIndexSpec`) always propagate.
    pub fn recoverable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidQuery
                | ErrorKind::FieldDoesNotExist
                | ErrorKind::DoesNotExist
                | ErrorKind::MultipleObjectsReturned
                | ErrorKind::Write
                | ErrorKind::IndexCreation
                | ErrorKind::UniqueViolation
        )
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidQuery => write!(f, "Invalid query"),
            ErrorKind::FieldDoesNotExist => write!(f, "Field does not exist"),
            ErrorKind::DoesNotExist => write!(f, "Does not exist"),
            ErrorKind::MultipleObjectsReturned => write!(f, "Multiple objects returned"),
            ErrorKind::Write => write!(f, "Write error"),
            ErrorKind::IndexCreation => write!(f, "Index creation error"),
            ErrorKind::UniqueViolation => write!(f, "Unique constraint violation"),
            ErrorKind::InvalidIndexSpec => write!(f, "Invalid index spec"),
            ErrorKind::IncompleteBinding => write!(f, "Incomplete repository binding"),
            ErrorKind::ModelMapping => write!(f, "Model mapping error"),
            ErrorKind::Internal => write!(f, "Internal error"),
        }
    }
}

/// Custom documap error type.
///
/// `DocumapError` carries the error message, kind, and an optional cause.
/// It supports error chaining and captures a backtrace at creation for
/// debugging.
#[derive(Clone)]
pub struct DocumapError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<DocumapError>>,
    backtrace: Arc<Backtrace>,
}

impl DocumapError {
    /// Creates a new `DocumapError` with the specified message and kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        DocumapError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Creates a new `DocumapError` chaining an underlying cause.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: DocumapError) -> Self {
        DocumapError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&DocumapError> {
        self.cause.as_deref()
    }
}

impl Display for DocumapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for DocumapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace),
        }
    }
}

impl Error for DocumapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for documap operations.
pub type DocumapResult<T> = Result<T, DocumapError>;

impl From<std::io::Error> for DocumapError {
    fn from(err: std::io::Error) -> Self {
        DocumapError::new(&format!("IO error: {}", err), ErrorKind::Internal)
    }
}

impl From<String> for DocumapError {
    fn from(msg: String) -> Self {
        DocumapError::new(&msg, ErrorKind::Internal)
    }
}

impl From<&str> for DocumapError {
    fn from(msg: &str) -> Self {
        DocumapError::new(msg, ErrorKind::Internal)
    }
}
