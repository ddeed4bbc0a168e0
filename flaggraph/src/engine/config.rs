/// Default actor recorded for cascaded deactivations.
pub const DEFAULT_SYSTEM_ACTOR: &str = "system";

/// Default maximum length of a flag name, in characters.
pub const DEFAULT_MAX_NAME_LEN: usize = 50;

/// Default maximum length of an actor string, in characters.
pub const DEFAULT_MAX_ACTOR_LEN: usize = 100;

/// Configuration for [`FlagEngine`](super::FlagEngine).
///
/// # Example
///
/// ```
/// use flaggraph::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_system_actor("cascade-bot")
///     .with_max_name_len(64);
/// assert_eq!(config.system_actor, "cascade-bot");
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Actor written on `auto_disable` audit entries.
    pub system_actor: String,
    /// Flag names longer than this are rejected.
    pub max_name_len: usize,
    /// Actor strings longer than this are rejected.
    pub max_actor_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            system_actor: DEFAULT_SYSTEM_ACTOR.to_string(),
            max_name_len: DEFAULT_MAX_NAME_LEN,
            max_actor_len: DEFAULT_MAX_ACTOR_LEN,
        }
    }
}

impl EngineConfig {
    pub fn with_system_actor(mut self, actor: impl Into<String>) -> Self {
        self.system_actor = actor.into();
        self
    }

    pub fn with_max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len;
        self
    }

    pub fn with_max_actor_len(mut self, len: usize) -> Self {
        self.max_actor_len = len;
        self
    }
}
