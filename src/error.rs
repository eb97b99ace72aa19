use miette::Diagnostic;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

/// Boxed cause carried by [`LedgerError::Internal`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Diagnostic, Debug)]
pub enum LedgerError {
    #[error("invalid request: {0}")]
    #[diagnostic(code(ledger::invalid_request))]
    InvalidRequest(String),

    #[error("{0} not found")]
    #[diagnostic(code(ledger::not_found))]
    NotFound(String),

    #[error("insufficient funds")]
    #[diagnostic(code(ledger::insufficient_funds))]
    InsufficientFunds,

    #[error("balance for user {0} already exists")]
    #[diagnostic(code(ledger::already_exists))]
    AlreadyExists(Uuid),

    /// Store or transport fault. `scope` names the operations the error
    /// travelled through, innermost last.
    #[error("internal error in {scope}: {source}")]
    #[diagnostic(code(ledger::internal))]
    Internal { scope: String, source: BoxError },
}

/// Coarse classification used by front ends to pick a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    InsufficientFunds,
    AlreadyExists,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::InvalidRequest | ErrorKind::InsufficientFunds => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::AlreadyExists => 409,
            ErrorKind::Internal => 500,
        }
    }
}

impl LedgerError {
    pub fn internal<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        LedgerError::Internal {
            scope: String::new(),
            source: source.into(),
        }
    }

    pub fn balance_not_found(user_id: Uuid) -> Self {
        LedgerError::NotFound(format!("balance for user {user_id}"))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::InsufficientFunds => ErrorKind::InsufficientFunds,
            LedgerError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            LedgerError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Annotates an internal error with the operation it passed through.
    /// Other kinds are returned untouched.
    pub fn with_scope(self, operation: &str) -> Self {
        match self {
            LedgerError::Internal { scope, source } => {
                let scope = if scope.is_empty() {
                    operation.to_string()
                } else {
                    format!("{operation} > {scope}")
                };
                LedgerError::Internal { scope, source }
            }
            other => other,
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::internal(err)
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::internal(err)
    }
}

impl From<csv::Error> for LedgerError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            LedgerError::internal(err)
        } else {
            LedgerError::InvalidRequest(err.to_string())
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        LedgerError::internal(err)
    }
}
