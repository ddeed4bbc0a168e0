//! Dependency graph for feature flags
//!
//! This module owns the in-memory picture of flags and their "depends-on"
//! edges, and the algorithms that run over it:
//!
//! - [`FlagGraph`]: flags plus bidirectional adjacency lists
//! - [`cycle`]: reachability search that rejects edges closing a loop
//! - [`cascade`]: the set of dependents a deactivation must reach
//!
//! Everything here is synchronous and side-effect free apart from the
//! explicit mutators on [`FlagGraph`]. Persistence and audit live in the
//! engine.

pub mod cascade;
pub mod cycle;
mod error;
mod flag_graph;

pub use cascade::{cascade_deactivation, Deactivation};
pub use error::{GraphError, GraphResult};
pub use flag_graph::{validate_flag_name, FlagGraph};
