use crate::core::CoreError;
use thiserror::Error;

/// Storage layer error type for the flaggraph engine.
///
/// This error type wraps underlying database errors while preserving the
/// full error chain for debugging.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// A database operation failed.
    #[cfg(feature = "sqlite")]
    #[error("database operation failed")]
    Database(#[from] sqlx::Error),

    /// Connecting to or configuring the backend failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// A changeset violated a uniqueness or reference constraint.
    /// Nothing from the changeset was written.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// A stored record could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// A stored enum column held an unknown value.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, StorageError>;
