use thiserror::Error;

/// Core error type for the flaggraph engine.
///
/// Raised when decoding the domain's string encodings (audit actions,
/// flag states) coming back from storage or from a request dispatcher.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CoreError {
    /// An unknown audit action string was encountered during parsing.
    #[error("invalid audit action: {0}")]
    InvalidAction(String),

    /// An unknown flag state string was encountered during parsing.
    #[error("invalid flag state: {0}")]
    InvalidState(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
