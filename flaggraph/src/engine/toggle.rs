//! Toggle state machine
//!
//! A manual toggle moves a flag between [`FlagState::Active`] and
//! [`FlagState::Inactive`]:
//!
//! - `Active -> Inactive` is always allowed. Every active transitive
//!   dependent is disabled first (one `auto_disable` entry each), then the
//!   flag itself flips and a `toggle_off` entry is written.
//! - `Inactive -> Active` is allowed only if every direct dependency is
//!   active. Otherwise the toggle is refused with the inactive dependency
//!   names and nothing is written.
//!
//! Planning is pure: it reads the graph and returns the changeset to
//! commit. The engine applies it only after the store accepted it.

use super::audit::{cascade_reason, AuditRecorder, TOGGLE_OFF_REASON, TOGGLE_ON_REASON};
use super::error::{EngineError, Result};
use crate::core::{AuditAction, AuditId, FlagId, FlagState};
use crate::graph::{cascade_deactivation, FlagGraph};
use crate::storage::{Changeset, StateChange};
use serde::{Deserialize, Serialize};

/// Result of a successful toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOutcome {
    pub flag: FlagId,
    pub name: String,
    pub new_state: FlagState,
    /// Flags disabled by the cascade, in the order they were reached.
    pub cascaded: Vec<String>,
}

impl ToggleOutcome {
    pub fn cascaded_count(&self) -> usize {
        self.cascaded.len()
    }

    /// Short confirmation, e.g. `"C is now inactive"`.
    pub fn message(&self) -> String {
        format!("{} is now {}", self.name, self.new_state)
    }
}

/// A toggle ready to be committed.
#[derive(Debug)]
pub(crate) struct TogglePlan {
    pub changes: Changeset,
    pub outcome: ToggleOutcome,
    pub last_audit_id: AuditId,
}

pub(crate) fn plan_toggle(
    graph: &FlagGraph,
    id: FlagId,
    actor: &str,
    system_actor: &str,
    last_audit_id: AuditId,
) -> Result<TogglePlan> {
    let flag = graph.get_by_id(id)?;
    let mut recorder = AuditRecorder::after(last_audit_id);
    let mut changes = Changeset::new();
    let mut cascaded = Vec::new();

    let new_state = flag.state().toggled();
    match new_state {
        FlagState::Inactive => {
            for step in cascade_deactivation(graph, id) {
                let dependent = graph.get_by_id(step.flag)?;
                let cause = graph.get_by_id(step.cause)?;
                changes.state_changes.push(StateChange {
                    flag: step.flag,
                    active: false,
                });
                recorder.record(
                    dependent,
                    AuditAction::AutoDisable,
                    cascade_reason(cause.name()),
                    system_actor,
                )?;
                cascaded.push(dependent.name().to_string());
            }

            changes.state_changes.push(StateChange {
                flag: id,
                active: false,
            });
            recorder.record(flag, AuditAction::ToggleOff, TOGGLE_OFF_REASON, actor)?;
        }
        FlagState::Active => {
            let inactive: Vec<String> = graph
                .outgoing(id)
                .into_iter()
                .filter(|dep| !dep.is_active())
                .map(|dep| dep.name().to_string())
                .collect();
            if !inactive.is_empty() {
                return Err(EngineError::inactive_dependencies(flag.name(), inactive));
            }

            changes.state_changes.push(StateChange {
                flag: id,
                active: true,
            });
            recorder.record(flag, AuditAction::ToggleOn, TOGGLE_ON_REASON, actor)?;
        }
    }

    let last_audit_id = recorder.last_id();
    changes.audit_entries = recorder.finish();

    Ok(TogglePlan {
        changes,
        outcome: ToggleOutcome {
            flag: id,
            name: flag.name().to_string(),
            new_state,
            cascaded,
        },
        last_audit_id,
    })
}
