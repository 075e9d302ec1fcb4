use crate::{BindType, Value};
use std::fmt::{self, Display};
use thiserror::Error;

/// Typed root cause of a failure.
///
/// Operations return [`crate::Error`] (an `anyhow::Error`); when the failure belongs to one of
/// the categories below the error carries a `SluiceError` that callers can recover with
/// `error.downcast_ref::<SluiceError>()`.
#[derive(Debug, Error)]
pub enum SluiceError {
    // Compilation
    #[error("Query expects {expected} positional arguments but {actual} were supplied")]
    BindCountMismatch { expected: usize, actual: usize },
    #[error("Bind `{name}` is declared as {declared} but the value is {value:?}")]
    BindType {
        name: String,
        declared: BindType,
        value: Value,
    },
    #[error("Value {0:?} cannot be written as a SQL literal")]
    UnescapableValue(Value),
    #[error("Named placeholder `:{0}` has no bind")]
    UnboundPlaceholder(String),
    #[error("Bind `{0}` does not match any placeholder in the query")]
    UnknownBind(String),

    // Backend
    #[error("{backend} error: {message}\nQuery: {query}\nArguments: {args}")]
    Backend {
        backend: &'static str,
        message: String,
        query: String,
        args: ArgsDisplay,
    },

    // Cache
    #[error("Cache {operation} failed for key `{key}`")]
    Cache {
        operation: CacheOperation,
        key: String,
    },

    // Integrity
    #[error("Duplicate key {value:?} in column `{column}`")]
    DuplicateKey { column: String, value: Value },
    #[error("Key column `{0}` is not present in the row")]
    MissingKeyColumn(String),
    #[error("No rows updated in table `{table}`")]
    NoRowsUpdated { table: String },
    #[error("Update on table `{table}` matched {rows} rows instead of one")]
    AmbiguousUpdate { table: String, rows: u64 },
    #[error("Table `{0}` has no primary key")]
    MissingPrimaryKey(String),
    #[error("Primary key column `{column}` of table `{table}` is not set")]
    PrimaryKeyNotSet { table: String, column: String },
    #[error("No row of table `{0}` matches the primary key")]
    EntityNotFound(String),
    #[error("{operation} on table `{table}` affected {rows} rows instead of one")]
    UnexpectedRowCount {
        operation: &'static str,
        table: String,
        rows: u64,
    },

    // Resource state
    #[error("The connection is not open")]
    NotConnected,
    #[error("The connection is already open")]
    AlreadyConnected,
    #[error("A transaction is already open")]
    TransactionOpen,
    #[error("No transaction is open")]
    NoTransaction,
    #[error("Only read queries can be cached: `{0}`")]
    CachingNonRead(String),
    #[error("The statement has not been executed")]
    NotExecuted,
    #[error("The connection is in use by another operation")]
    ConnectionBusy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOperation {
    Get,
    Set,
    Delete,
}

impl Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheOperation::Get => "get",
            CacheOperation::Set => "set",
            CacheOperation::Delete => "delete",
        })
    }
}

/// Positional arguments rendered for a diagnostic.
#[derive(Debug, Clone, Default)]
pub struct ArgsDisplay(pub Vec<Value>);

impl Display for ArgsDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match v.as_text() {
                Some(text) => write!(f, "{:?}", text)?,
                None if v.is_null() => f.write_str("NULL")?,
                None => write!(f, "{:?}", v)?,
            }
        }
        f.write_str("]")
    }
}

impl SluiceError {
    /// The outermost `SluiceError` carried by `error`, as cause or as context.
    pub fn of(error: &crate::Error) -> Option<&SluiceError> {
        error.downcast_ref::<SluiceError>()
    }
}

/// Log `error` once at the failure site and hand it back.
pub(crate) fn logged(error: impl Into<crate::Error>) -> crate::Error {
    let error = error.into();
    log::error!("{:#}", error);
    error
}
