//! Core types for the flaggraph engine.
//!
//! # Domain Model
//! - [`Flag`]: A named boolean feature switch
//! - [`FlagId`]: Numeric identity assigned when a flag is created
//! - [`FlagState`]: The two activation states a flag moves between
//! - [`DependencyEdge`]: "flag `from` requires flag `to` to be active"
//! - [`FlagView`]: A flag together with the names of its neighbours
//! - [`AuditEntry`] / [`AuditAction`]: Immutable record of a state change
//!
//! # Error Handling
//! - [`CoreError`]: Parsing errors for the string encodings used in storage
//!
//! # Example
//!
//! ```
//! use flaggraph::core::{AuditAction, FlagState};
//!
//! assert_eq!(AuditAction::AutoDisable.as_str(), "auto_disable");
//! assert_eq!(FlagState::Active.toggled(), FlagState::Inactive);
//! ```

mod audit;
mod error;
mod flag;

pub use audit::{AuditAction, AuditEntry, AuditId};
pub use error::{CoreError, Result};
pub use flag::{DependencyEdge, DependencyLink, Flag, FlagId, FlagState, FlagView};
