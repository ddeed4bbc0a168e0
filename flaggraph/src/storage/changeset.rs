use crate::core::{AuditEntry, AuditId, DependencyEdge, Flag, FlagId};

/// Everything a single engine operation writes.
///
/// The engine validates against its in-memory graph, collects the writes
/// here and hands them to [`FlagStore::commit`](super::FlagStore::commit)
/// in one call, so a backend can apply them as a single transaction.
/// Backends apply the parts in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    /// Flags to insert
    pub flags: Vec<Flag>,
    /// Dependency edges to insert, in order
    pub edges: Vec<DependencyEdge>,
    /// Active-bit updates for existing flags, in order
    pub state_changes: Vec<StateChange>,
    /// Audit entries to append, in order
    pub audit_entries: Vec<AuditEntry>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if committing would write nothing
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
            && self.edges.is_empty()
            && self.state_changes.is_empty()
            && self.audit_entries.is_empty()
    }
}

/// New value of a flag's active bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub flag: FlagId,
    pub active: bool,
}

/// The full persisted state, as loaded when an engine starts.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Flags in creation order
    pub flags: Vec<Flag>,
    /// Edges in creation order
    pub edges: Vec<DependencyEdge>,
    /// Id of the newest audit entry, 0 when the log is empty
    pub last_audit_id: AuditId,
}
