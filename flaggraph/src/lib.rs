//! flaggraph: feature flags with dependencies
//!
//! `flaggraph` manages named boolean feature flags connected by directed
//! "depends-on" edges and keeps two promises about them:
//!
//! - the dependency graph never contains a cycle
//! - a flag can only be switched on while everything it depends on is on
//!
//! Switching a flag off cascades to every flag that depends on it, directly
//! or transitively, and every state change lands in an append-only audit log.
//!
//! # Quick Start
//!
//! ```
//! use flaggraph::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = FlagEngine::open(Arc::new(InMemoryFlagStore::new())).await?;
//!
//! engine.create_flag(NewFlag::new("A"), "API").await?;
//! engine.create_flag(NewFlag::new("B"), "API").await?;
//! let c = engine.create_flag(NewFlag::new("C"), "API").await?;
//! engine.add_dependency("A", "B").await?;
//! engine.add_dependency("B", "C").await?;
//!
//! // C off takes B and A with it
//! let outcome = engine.toggle_flag(c.id(), "API").await?;
//! assert_eq!(outcome.message(), "C is now inactive");
//! assert_eq!(outcome.cascaded, vec!["B", "A"]);
//!
//! // C depending on A would close A -> B -> C -> A
//! assert!(engine.add_dependency("C", "A").await.is_err());
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`core`]: Domain types (flags, states, audit entries)
//! - [`graph`]: The dependency graph, cycle validation and cascade planning
//! - [`storage`]: Persistence layer (hides database choice and schema)
//! - [`engine`]: The operations a request dispatcher calls

pub mod core;
pub mod engine;
pub mod graph;
pub mod storage;

// Re-export commonly used types for convenience
pub use core::{
    AuditAction, AuditEntry, AuditId, CoreError, DependencyEdge, DependencyLink, Flag, FlagId,
    FlagState, FlagView,
};

pub use engine::{
    EngineConfig, EngineError, FlagEngine, NewFlag, Result as EngineResult, ToggleOutcome,
};

pub use graph::{FlagGraph, GraphError, GraphResult};

pub use storage::{
    Changeset, FlagStore, InMemoryFlagStore, Result as StorageResult, Snapshot, StorageError,
};

#[cfg(feature = "sqlite")]
pub use storage::{PoolConfig, SqliteFlagStore};

/// Everything needed to drive an engine.
pub mod prelude {
    pub use crate::core::{AuditAction, AuditEntry, Flag, FlagId, FlagState, FlagView};
    pub use crate::engine::{EngineConfig, EngineError, FlagEngine, NewFlag, ToggleOutcome};
    pub use crate::storage::{FlagStore, InMemoryFlagStore};

    #[cfg(feature = "sqlite")]
    pub use crate::storage::SqliteFlagStore;
}
