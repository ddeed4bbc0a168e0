use super::audit::{created_reason, AuditRecorder};
use super::config::EngineConfig;
use super::error::{EngineError, Result};
use super::toggle::{plan_toggle, ToggleOutcome};
use crate::core::{
    AuditAction, AuditEntry, AuditId, DependencyEdge, DependencyLink, Flag, FlagId, FlagView,
};
use crate::graph::{cycle, validate_flag_name, FlagGraph, GraphError, GraphResult};
use crate::storage::{Changeset, FlagStore, StorageError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Request to create a flag.
///
/// # Example
///
/// ```
/// use flaggraph::NewFlag;
///
/// let request = NewFlag::new("checkout").depends_on("payments");
/// assert!(request.active);
/// assert_eq!(request.dependency_names, vec!["payments"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFlag {
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Names of the flags the new flag depends on.
    #[serde(default)]
    pub dependency_names: Vec<String>,
}

fn default_active() -> bool {
    true
}

impl NewFlag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            dependency_names: Vec::new(),
        }
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependency_names.push(name.into());
        self
    }

    pub fn with_dependencies<I, T>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.dependency_names.extend(names.into_iter().map(Into::into));
        self
    }
}

struct EngineState {
    graph: FlagGraph,
    last_audit_id: AuditId,
}

impl EngineState {
    /// Mirrors a committed changeset into the graph.
    fn apply(&mut self, changes: &Changeset, last_audit_id: AuditId) -> GraphResult<()> {
        for flag in &changes.flags {
            self.graph.insert_flag(flag.clone())?;
        }
        for edge in &changes.edges {
            self.graph.add_edge(edge.from, edge.to)?;
        }
        for change in &changes.state_changes {
            self.graph.set_active(change.flag, change.active)?;
        }
        self.last_audit_id = last_audit_id;
        Ok(())
    }
}

/// Flag dependency graph engine.
///
/// Mutating operations are serialized by one writer lock that is held
/// across the store commit, so validation always sees the state it is
/// about to change. Listing flags takes the read lock; audit log reads go
/// straight to the store.
///
/// # Example
///
/// ```
/// use flaggraph::{FlagEngine, FlagState, InMemoryFlagStore, NewFlag};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = FlagEngine::open(Arc::new(InMemoryFlagStore::new())).await?;
/// let payments = engine.create_flag(NewFlag::new("payments"), "API").await?;
/// engine
///     .create_flag(NewFlag::new("checkout").depends_on("payments"), "API")
///     .await?;
///
/// let outcome = engine.toggle_flag(payments.id(), "API").await?;
/// assert_eq!(outcome.new_state, FlagState::Inactive);
/// assert_eq!(outcome.cascaded, vec!["checkout"]);
/// # Ok(())
/// # }
/// ```
pub struct FlagEngine<S: FlagStore> {
    store: Arc<S>,
    config: EngineConfig,
    state: RwLock<EngineState>,
}

impl<S: FlagStore> FlagEngine<S> {
    /// Loads the persisted state with the default configuration.
    pub async fn open(store: Arc<S>) -> Result<Self> {
        Self::with_config(store, EngineConfig::default()).await
    }

    pub async fn with_config(store: Arc<S>, config: EngineConfig) -> Result<Self> {
        let snapshot = store.load().await?;
        if snapshot.last_audit_id == AuditId::MAX {
            return Err(StorageError::Corrupt(format!(
                "audit id {} leaves no room for new entries",
                snapshot.last_audit_id
            ))
            .into());
        }
        let graph = FlagGraph::from_parts(snapshot.flags, snapshot.edges)
            .map_err(|e| StorageError::Corrupt(format!("stored flags: {}", e)))?;
        if graph.has_cycle() {
            warn!("Stored dependency graph contains a cycle; cascades still terminate");
        }

        info!(
            flags = graph.len(),
            edges = graph.edge_count(),
            last_audit_id = snapshot.last_audit_id,
            "Opened flag engine"
        );

        Ok(Self {
            store,
            config,
            state: RwLock::new(EngineState {
                graph,
                last_audit_id: snapshot.last_audit_id,
            }),
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn check_actor(&self, actor: &str) -> Result<()> {
        if actor.trim().is_empty() {
            return Err(EngineError::invalid_actor(actor, "actor may not be blank"));
        }
        if actor.chars().count() > self.config.max_actor_len {
            return Err(EngineError::invalid_actor(
                actor,
                format!("actor is longer than {} characters", self.config.max_actor_len),
            ));
        }
        Ok(())
    }

    /// Commits a changeset, then mirrors it into the graph.
    async fn commit(
        &self,
        state: &mut EngineState,
        changes: &Changeset,
        last_audit_id: AuditId,
    ) -> Result<()> {
        self.store.commit(changes).await?;
        // The changeset was validated against this graph under the same
        // lock, so applying it cannot fail unless the graph is corrupt.
        state.apply(changes, last_audit_id).map_err(|e| {
            error!(error = %e, "Committed changeset could not be applied to the graph");
            EngineError::from(e)
        })
    }

    /// Creates a flag with its initial dependencies.
    ///
    /// Checks run in this order: name, then each dependency (self
    /// reference, existence, repetition, cycle), then name uniqueness. A
    /// dependency list that reaches an existing flag of the same name is
    /// therefore reported as a cycle.
    pub async fn create_flag(&self, request: NewFlag, actor: &str) -> Result<Flag> {
        self.check_actor(actor)?;
        let name = validate_flag_name(&request.name, self.config.max_name_len)?;
        let dependency_names: Vec<String> = request
            .dependency_names
            .iter()
            .map(|dep| dep.trim().to_string())
            .collect();

        let mut state = self.state.write().await;
        let dependencies =
            cycle::check_new_flag(&state.graph, &name, &dependency_names).inspect_err(|e| {
                debug!(flag = %name, error = %e, "Rejected flag creation");
            })?;
        if state.graph.contains_name(&name) {
            return Err(GraphError::duplicate_name(name).into());
        }

        let flag = Flag::new(state.graph.next_id()?, name, request.active, Utc::now());
        let mut recorder = AuditRecorder::after(state.last_audit_id);
        recorder.record(&flag, AuditAction::Create, created_reason(flag.name()), actor)?;
        let last_audit_id = recorder.last_id();

        let changes = Changeset {
            flags: vec![flag.clone()],
            edges: dependencies
                .iter()
                .map(|dep| DependencyEdge::new(flag.id(), *dep))
                .collect(),
            audit_entries: recorder.finish(),
            ..Changeset::default()
        };
        self.commit(&mut state, &changes, last_audit_id).await?;

        info!(
            flag = %flag.name(),
            id = flag.id().get(),
            active = flag.is_active(),
            dependencies = changes.edges.len(),
            "Created flag"
        );
        Ok(flag)
    }

    /// Adds the edge "`from_name` depends on `to_name`".
    ///
    /// Writes no audit entry: no flag changes state.
    pub async fn add_dependency(&self, from_name: &str, to_name: &str) -> Result<DependencyLink> {
        let mut state = self.state.write().await;
        let from = state.graph.get(from_name.trim())?.id();
        let to = state.graph.get(to_name.trim())?.id();
        cycle::check_edge(&state.graph, from, to).inspect_err(|e| {
            debug!(from = %from_name, to = %to_name, error = %e, "Rejected dependency");
        })?;

        let changes = Changeset {
            edges: vec![DependencyEdge::new(from, to)],
            ..Changeset::default()
        };
        let last_audit_id = state.last_audit_id;
        self.commit(&mut state, &changes, last_audit_id).await?;

        let link = DependencyLink {
            flag: state.graph.get_by_id(from)?.name().to_string(),
            depends_on: state.graph.get_by_id(to)?.name().to_string(),
        };
        info!(dependency = %link, "Added dependency");
        Ok(link)
    }

    /// Flips a flag between active and inactive.
    ///
    /// Turning a flag off disables every active flag that depends on it,
    /// directly or transitively, in the same commit. Turning a flag on is
    /// refused while any direct dependency is inactive.
    pub async fn toggle_flag(&self, id: FlagId, actor: &str) -> Result<ToggleOutcome> {
        self.check_actor(actor)?;
        let mut state = self.state.write().await;
        let plan = plan_toggle(
            &state.graph,
            id,
            actor,
            &self.config.system_actor,
            state.last_audit_id,
        )
        .inspect_err(|e| {
            debug!(id = id.get(), error = %e, "Rejected toggle");
        })?;
        self.commit(&mut state, &plan.changes, plan.last_audit_id)
            .await?;

        let outcome = plan.outcome;
        if outcome.cascaded.is_empty() {
            info!(flag = %outcome.name, state = %outcome.new_state, "Toggled flag");
        } else {
            info!(
                flag = %outcome.name,
                state = %outcome.new_state,
                cascaded = outcome.cascaded_count(),
                "Toggled flag and disabled dependents"
            );
        }
        Ok(outcome)
    }

    /// All flags in creation order, with neighbour names.
    pub async fn list_flags(&self) -> Vec<FlagView> {
        self.state.read().await.graph.views()
    }

    pub async fn get_flag(&self, id: FlagId) -> Result<FlagView> {
        Ok(self.state.read().await.graph.view(id)?)
    }

    pub async fn get_flag_by_name(&self, name: &str) -> Result<FlagView> {
        let state = self.state.read().await;
        let id = state.graph.get(name.trim())?.id();
        Ok(state.graph.view(id)?)
    }

    /// The whole audit log, oldest entry first.
    pub async fn list_audit_log(&self) -> Result<Vec<AuditEntry>> {
        Ok(self.store.audit_log().await?)
    }

    /// Audit entries of one flag, oldest entry first.
    pub async fn audit_log_for(&self, id: FlagId) -> Result<Vec<AuditEntry>> {
        if !self.state.read().await.graph.contains(id) {
            return Err(GraphError::flag_not_found(id).into());
        }
        Ok(self.store.audit_log_for_flag(id).await?)
    }

    /// A copy of the current graph, for inspection.
    pub async fn graph(&self) -> FlagGraph {
        self.state.read().await.graph.clone()
    }
}
