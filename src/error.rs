//! Library error type.
//!
//! Every fallible operation in the crate returns [`Result`]. Constraint
//! failures reported by SQLite are lifted into [`Error::SchemaViolation`] at
//! conversion time so callers never have to inspect raw error codes.

use rusqlite::ErrorCode;

/// Errors surfaced by the store, the index and the scheduler.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required startup setting is absent.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// A setting is present but unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Foreign-key, uniqueness or check constraint violated.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// Operation attempted on a session that has been ended.
    #[error("session is not active")]
    SessionNotActive,

    /// The full-text index no longer mirrors the attribute rows.
    #[error("index out of sync: {0}")]
    IndexDesync(String),

    /// Review outcome outside positive / negative / neutral.
    #[error("invalid review outcome: {0}")]
    InvalidOutcome(String),

    /// Lookup by id found nothing.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A stored value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking session task panicked or was cancelled.
    #[error("session task failed: {0}")]
    Task(String),
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            Self::SchemaViolation(e.to_string())
        } else {
            Self::Database(e)
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
