//! Audit recorder
//!
//! Hands out sequential audit ids for the entries of one operation. The
//! entries only become part of the log when the surrounding changeset is
//! committed; a dropped recorder leaves no trace and its ids are reused.

use crate::core::{AuditAction, AuditEntry, AuditId, Flag};
use crate::storage::{self, StorageError};
use chrono::{DateTime, Utc};

/// Builds the audit entries of a single engine operation.
#[derive(Debug)]
pub struct AuditRecorder {
    last_id: AuditId,
    timestamp: DateTime<Utc>,
    entries: Vec<AuditEntry>,
}

impl AuditRecorder {
    /// Starts recording after the entry with id `last_id`.
    ///
    /// All entries of one operation share a timestamp; the id keeps them
    /// ordered.
    pub fn after(last_id: AuditId) -> Self {
        Self {
            last_id,
            timestamp: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// Appends one entry. Fails only when no audit id is left.
    pub fn record(
        &mut self,
        flag: &Flag,
        action: AuditAction,
        reason: impl Into<String>,
        actor: impl Into<String>,
    ) -> storage::Result<&AuditEntry> {
        let id = self.last_id.checked_add(1).ok_or_else(|| {
            StorageError::Constraint(format!("audit ids exhausted after {}", self.last_id))
        })?;
        self.last_id = id;
        let index = self.entries.len();
        self.entries.push(AuditEntry::new(
            id,
            flag.id(),
            flag.name(),
            action,
            self.timestamp,
            reason,
            actor,
        ));
        Ok(&self.entries[index])
    }

    /// Id of the newest entry recorded so far, or the starting point.
    pub fn last_id(&self) -> AuditId {
        self.last_id
    }

    pub fn finish(self) -> Vec<AuditEntry> {
        self.entries
    }
}

/// Reason written on the `create` entry.
pub fn created_reason(name: &str) -> String {
    format!("Flag {} was created", name)
}

/// Reason written on each `auto_disable` entry.
pub fn cascade_reason(cause: &str) -> String {
    format!("Dependency {} was disabled", cause)
}

pub const TOGGLE_ON_REASON: &str = "manual active";
pub const TOGGLE_OFF_REASON: &str = "manual inactive";
