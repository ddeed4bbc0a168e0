//! Error types for graph operations
//!
//! Every variant is a validation failure: it is reported to the caller and
//! no mutation has happened when it is returned.

use crate::core::FlagId;
use thiserror::Error;

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur during graph operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GraphError {
    /// Adding the requested edge(s) would close a dependency loop
    #[error("Cycle detected in dependency graph: {path}")]
    CycleDetected {
        /// Human-readable description of the cycle path
        path: String,
    },

    /// A flag was not found in the graph
    #[error("Flag not found: {flag}")]
    FlagNotFound {
        /// The name or id that was looked up
        flag: String,
    },

    /// A new flag lists a dependency that does not exist
    #[error("Dependency '{dependency}' for flag '{flag}' does not exist")]
    UnknownDependency {
        /// The flag being created
        flag: String,
        /// The dependency that was not found
        dependency: String,
    },

    /// A flag id is already taken (only reachable when restoring state)
    #[error("Duplicate flag id: {id}")]
    DuplicateId {
        /// The duplicate id
        id: FlagId,
    },

    /// No id is left after `id`
    #[error("Flag ids exhausted after {id}")]
    IdsExhausted {
        /// The largest id in use
        id: FlagId,
    },

    /// A flag with the same name already exists
    #[error("Duplicate flag name: {name}")]
    DuplicateName {
        /// The duplicate name
        name: String,
    },

    /// The same dependency edge was requested twice
    #[error("Flag '{flag}' already depends on '{depends_on}'")]
    DuplicateEdge {
        /// The dependent flag
        flag: String,
        /// The dependency
        depends_on: String,
    },

    /// A flag was asked to depend on itself
    #[error("Flag '{flag}' cannot depend on itself")]
    SelfDependency {
        /// The flag with self-dependency
        flag: String,
    },

    /// A flag name failed validation (blank or too long)
    #[error("Invalid flag name '{name}': {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },
}

impl GraphError {
    /// Creates a cycle detected error with the given path
    pub fn cycle(path: impl Into<String>) -> Self {
        Self::CycleDetected { path: path.into() }
    }

    /// Creates a flag not found error
    pub fn flag_not_found(flag: impl ToString) -> Self {
        Self::FlagNotFound {
            flag: flag.to_string(),
        }
    }

    /// Creates an unknown dependency error
    pub fn unknown_dependency(flag: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self::UnknownDependency {
            flag: flag.into(),
            dependency: dependency.into(),
        }
    }

    /// Creates a duplicate name error
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Creates a duplicate edge error
    pub fn duplicate_edge(flag: impl Into<String>, depends_on: impl Into<String>) -> Self {
        Self::DuplicateEdge {
            flag: flag.into(),
            depends_on: depends_on.into(),
        }
    }

    /// Creates a self-dependency error
    pub fn self_dependency(flag: impl Into<String>) -> Self {
        Self::SelfDependency { flag: flag.into() }
    }

    /// Creates an invalid name error
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
