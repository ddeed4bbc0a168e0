use super::error::{CoreError, Result};
use super::flag::FlagId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sequence number of an audit entry. Strictly increasing in creation order.
pub type AuditId = i64;

/// Kind of state-changing action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    ToggleOn,
    ToggleOff,
    AutoDisable,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::ToggleOn => "toggle_on",
            AuditAction::ToggleOff => "toggle_off",
            AuditAction::AutoDisable => "auto_disable",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(AuditAction::Create),
            "toggle_on" => Ok(AuditAction::ToggleOn),
            "toggle_off" => Ok(AuditAction::ToggleOff),
            "auto_disable" => Ok(AuditAction::AutoDisable),
            _ => Err(CoreError::InvalidAction(s.to_string())),
        }
    }
}

/// Immutable record of a single state-changing event.
///
/// Entries are only ever constructed by the audit recorder or rebuilt from
/// storage; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    id: AuditId,
    flag_id: FlagId,
    flag: String,
    action: AuditAction,
    timestamp: DateTime<Utc>,
    reason: String,
    actor: String,
}

impl AuditEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: AuditId,
        flag_id: FlagId,
        flag: impl Into<String>,
        action: AuditAction,
        timestamp: DateTime<Utc>,
        reason: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            id,
            flag_id,
            flag: flag.into(),
            action,
            timestamp,
            reason: reason.into(),
            actor: actor.into(),
        }
    }

    pub fn id(&self) -> AuditId {
        self.id
    }

    pub fn flag_id(&self) -> FlagId {
        self.flag_id
    }

    /// Name of the flag the entry refers to.
    pub fn flag(&self) -> &str {
        &self.flag
    }

    pub fn action(&self) -> AuditAction {
        self.action
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.action, self.flag)
    }
}
