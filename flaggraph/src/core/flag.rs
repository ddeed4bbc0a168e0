//! Flag identity and state.
//!
//! A flag is identified by its name for humans (dependency declarations use
//! names) and by a numeric [`FlagId`] for the storage layer and for toggle
//! requests. Both are fixed at creation.

use super::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric identifier of a flag.
///
/// # Examples
///
/// ```
/// use flaggraph::FlagId;
///
/// let id = FlagId::new(7);
/// assert_eq!(id.get(), 7);
/// assert_eq!(id.to_string(), "#7");
/// assert_eq!(id.next(), Some(FlagId::new(8)));
/// assert_eq!(FlagId::new(i64::MAX).next(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagId(i64);

impl FlagId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Returns the identifier following this one, or `None` at `i64::MAX`.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for FlagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for FlagId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Activation state of a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagState {
    Active,
    Inactive,
}

impl FlagState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagState::Active => "active",
            FlagState::Inactive => "inactive",
        }
    }

    pub fn is_active(self) -> bool {
        self == FlagState::Active
    }

    /// The state a manual toggle moves towards.
    pub fn toggled(self) -> Self {
        match self {
            FlagState::Active => FlagState::Inactive,
            FlagState::Inactive => FlagState::Active,
        }
    }
}

impl From<bool> for FlagState {
    fn from(active: bool) -> Self {
        if active {
            FlagState::Active
        } else {
            FlagState::Inactive
        }
    }
}

impl fmt::Display for FlagState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlagState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(FlagState::Active),
            "inactive" => Ok(FlagState::Inactive),
            _ => Err(CoreError::InvalidState(s.to_string())),
        }
    }
}

/// A named boolean feature switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    id: FlagId,
    name: String,
    active: bool,
    created_at: DateTime<Utc>,
}

impl Flag {
    pub fn new(id: FlagId, name: impl Into<String>, active: bool, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            active,
            created_at,
        }
    }

    pub fn id(&self) -> FlagId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> FlagState {
        FlagState::from(self.active)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Directed dependency: `from` can only be active while `to` is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The dependent flag.
    pub from: FlagId,
    /// The flag it relies on.
    pub to: FlagId,
}

impl DependencyEdge {
    pub fn new(from: FlagId, to: FlagId) -> Self {
        Self { from, to }
    }
}

/// A dependency edge described by flag names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyLink {
    pub flag: String,
    pub depends_on: String,
}

impl fmt::Display for DependencyLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ---> {}", self.flag, self.depends_on)
    }
}

/// A flag with the names of the flags it depends on and the flags that
/// depend on it, in edge insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagView {
    pub id: FlagId,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
}
