//! Storage layer for the flaggraph engine.
//!
//! This module provides a trait-based interface for persisting flags,
//! dependency edges and the audit log, with two backend implementations:
//!
//! - [`SqliteFlagStore`]: Persistent SQLite-based storage with connection pooling
//! - [`InMemoryFlagStore`]: In-memory storage for testing and development
//!
//! The engine keeps the authoritative graph in memory. A backend only has to
//! load the persisted state once and then apply each [`Changeset`]
//! atomically: either every write lands or none does.
//!
//! # Example
//!
//! ```no_run
//! use flaggraph::storage::{FlagStore, InMemoryFlagStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryFlagStore::new();
//! let snapshot = store.load().await?;
//! assert!(snapshot.flags.is_empty());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

mod changeset;
mod error;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod memory;

// Re-export public types
pub use changeset::{Changeset, Snapshot, StateChange};
pub use error::{Result, StorageError};
pub use memory::InMemoryFlagStore;

#[cfg(feature = "sqlite")]
pub use sqlite::{PoolConfig, SqliteFlagStore};

use crate::core::{AuditEntry, FlagId};

/// Trait for flag storage backends.
///
/// Implementations must be thread-safe. Reads of the audit log may run
/// concurrently with each other and with a commit.
#[async_trait]
pub trait FlagStore: Send + Sync {
    /// Load every flag and edge plus the position of the audit log.
    async fn load(&self) -> Result<Snapshot>;

    /// Apply all writes of a changeset as one atomic unit.
    ///
    /// On error nothing from the changeset may remain visible.
    async fn commit(&self, changes: &Changeset) -> Result<()>;

    /// Get the whole audit log, oldest entry first.
    async fn audit_log(&self) -> Result<Vec<AuditEntry>>;

    /// Get the audit entries of one flag, oldest entry first.
    ///
    /// # Default Implementation
    ///
    /// Filters [`FlagStore::audit_log`]. Backends with an index should
    /// override this.
    async fn audit_log_for_flag(&self, flag: FlagId) -> Result<Vec<AuditEntry>> {
        let entries = self.audit_log().await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.flag_id() == flag)
            .collect())
    }

    /// Close the store.
    async fn close(&self) -> Result<()>;
}

// Implement FlagStore for Box<dyn FlagStore> to allow type-erased storage
#[async_trait]
impl FlagStore for Box<dyn FlagStore> {
    async fn load(&self) -> Result<Snapshot> {
        (**self).load().await
    }

    async fn commit(&self, changes: &Changeset) -> Result<()> {
        (**self).commit(changes).await
    }

    async fn audit_log(&self) -> Result<Vec<AuditEntry>> {
        (**self).audit_log().await
    }

    async fn audit_log_for_flag(&self, flag: FlagId) -> Result<Vec<AuditEntry>> {
        (**self).audit_log_for_flag(flag).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}
