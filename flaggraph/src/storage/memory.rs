use super::{error::Result, error::StorageError, Changeset, FlagStore, Snapshot};
use crate::core::{AuditEntry, AuditId, DependencyEdge, Flag, FlagId};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory flag store.
///
/// All tables live behind a single `RwLock`, which makes a commit atomic
/// with respect to readers: a changeset is validated in full before the
/// first write, and readers never see half of it. Constraint checks mirror
/// the SQLite schema (unique names, unique edges, references to existing
/// flags, increasing audit ids).
///
/// Suitable for tests and single-process deployments; nothing survives
/// the process.
pub struct InMemoryFlagStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    flags: BTreeMap<FlagId, Flag>,
    names: HashSet<String>,
    edges: Vec<DependencyEdge>,
    edge_set: HashSet<DependencyEdge>,
    audit: Vec<AuditEntry>,
}

impl Tables {
    fn last_audit_id(&self) -> AuditId {
        self.audit.last().map(AuditEntry::id).unwrap_or(0)
    }

    /// Checks a changeset against current contents without writing.
    fn validate(&self, changes: &Changeset) -> Result<()> {
        let mut new_ids = HashSet::new();
        let mut new_names = HashSet::new();
        for flag in &changes.flags {
            if self.flags.contains_key(&flag.id()) || !new_ids.insert(flag.id()) {
                return Err(StorageError::Constraint(format!(
                    "flag id {} already exists",
                    flag.id()
                )));
            }
            if self.names.contains(flag.name()) || !new_names.insert(flag.name()) {
                return Err(StorageError::Constraint(format!(
                    "flag name '{}' already exists",
                    flag.name()
                )));
            }
        }

        let exists = |id: &FlagId| self.flags.contains_key(id) || new_ids.contains(id);

        let mut new_edges = HashSet::new();
        for edge in &changes.edges {
            if !exists(&edge.from) || !exists(&edge.to) {
                return Err(StorageError::Constraint(format!(
                    "edge {} -> {} references a missing flag",
                    edge.from, edge.to
                )));
            }
            if self.edge_set.contains(edge) || !new_edges.insert(*edge) {
                return Err(StorageError::Constraint(format!(
                    "edge {} -> {} already exists",
                    edge.from, edge.to
                )));
            }
        }

        for change in &changes.state_changes {
            if !exists(&change.flag) {
                return Err(StorageError::Constraint(format!(
                    "state change for missing flag {}",
                    change.flag
                )));
            }
        }

        let mut last_id = self.last_audit_id();
        for entry in &changes.audit_entries {
            if entry.id() <= last_id {
                return Err(StorageError::Constraint(format!(
                    "audit id {} is not after {}",
                    entry.id(),
                    last_id
                )));
            }
            if !exists(&entry.flag_id()) {
                return Err(StorageError::Constraint(format!(
                    "audit entry {} references missing flag {}",
                    entry.id(),
                    entry.flag_id()
                )));
            }
            last_id = entry.id();
        }

        Ok(())
    }

    fn apply(&mut self, changes: &Changeset) {
        for flag in &changes.flags {
            self.names.insert(flag.name().to_string());
            self.flags.insert(flag.id(), flag.clone());
        }
        for edge in &changes.edges {
            self.edge_set.insert(*edge);
            self.edges.push(*edge);
        }
        for change in &changes.state_changes {
            if let Some(flag) = self.flags.get_mut(&change.flag) {
                flag.set_active(change.active);
            }
        }
        self.audit.extend(changes.audit_entries.iter().cloned());
    }
}

impl InMemoryFlagStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for InMemoryFlagStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FlagStore for InMemoryFlagStore {
    async fn load(&self) -> Result<Snapshot> {
        let tables = self.tables.read().await;
        Ok(Snapshot {
            flags: tables.flags.values().cloned().collect(),
            edges: tables.edges.clone(),
            last_audit_id: tables.last_audit_id(),
        })
    }

    async fn commit(&self, changes: &Changeset) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.validate(changes)?;
        tables.apply(changes);
        debug!(
            flags = changes.flags.len(),
            edges = changes.edges.len(),
            state_changes = changes.state_changes.len(),
            audit_entries = changes.audit_entries.len(),
            "Committed changeset"
        );
        Ok(())
    }

    async fn audit_log(&self) -> Result<Vec<AuditEntry>> {
        Ok(self.tables.read().await.audit.clone())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
