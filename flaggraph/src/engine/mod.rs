//! The flag engine: the operations a request dispatcher calls.
//!
//! [`FlagEngine`] owns the authoritative [`FlagGraph`](crate::graph::FlagGraph)
//! behind a single writer lock and a [`FlagStore`](crate::storage::FlagStore)
//! for persistence. Every mutating operation follows the same shape:
//!
//! 1. validate against the current graph (read-only)
//! 2. collect the writes into a [`Changeset`](crate::storage::Changeset)
//! 3. commit the changeset to the store in one transaction
//! 4. apply it to the in-memory graph
//!
//! A failure at any step before 4 leaves both the graph and the store as
//! they were.

// Module organization:
// - audit: hides audit id assignment and the wording of audit reasons
// - toggle: hides the toggle state machine and cascade planning
// - flag_engine: the public operations and their locking
mod audit;
mod config;
mod error;
mod flag_engine;
mod toggle;

pub use audit::AuditRecorder;
pub use config::{EngineConfig, DEFAULT_MAX_ACTOR_LEN, DEFAULT_MAX_NAME_LEN, DEFAULT_SYSTEM_ACTOR};
pub use error::{EngineError, Result};
pub use flag_engine::{FlagEngine, NewFlag};
pub use toggle::ToggleOutcome;
