use crate::graph::GraphError;
use crate::storage::StorageError;
use thiserror::Error;

/// Engine layer error type for flaggraph.
///
/// Wraps graph validation and storage errors and adds the refusals that
/// only the engine can decide, such as toggling on a flag whose
/// dependencies are off.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// A graph validation failed (cycle, duplicate, unknown flag, etc.)
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A storage operation failed. Nothing from the operation was applied.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Toggle-on refused because direct dependencies are inactive.
    #[error("Flag '{flag}' has inactive dependencies: {}", .dependencies.join(", "))]
    InactiveDependencies {
        flag: String,
        /// Names of the inactive dependencies, in edge insertion order
        dependencies: Vec<String>,
    },

    /// The caller-supplied actor is blank or too long.
    #[error("Invalid actor '{actor}': {reason}")]
    InvalidActor { actor: String, reason: String },
}

impl EngineError {
    pub fn inactive_dependencies(flag: impl Into<String>, dependencies: Vec<String>) -> Self {
        Self::InactiveDependencies {
            flag: flag.into(),
            dependencies,
        }
    }

    pub fn invalid_actor(actor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidActor {
            actor: actor.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for refusals caused by the request rather than the
    /// system. These are safe to report back to the caller verbatim.
    pub fn is_validation(&self) -> bool {
        !matches!(self, EngineError::Storage(_))
    }

    /// The graph error behind this one, if any.
    pub fn as_graph_error(&self) -> Option<&GraphError> {
        match self {
            EngineError::Graph(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
