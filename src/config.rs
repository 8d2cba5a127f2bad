//! Machine configuration.
//!
//! Configuration is plain data so hosts can embed it in their own settings
//! files; [`MachineConfig::from_json`] covers the common case.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of status transitions kept per activation.
pub const DEFAULT_HISTORY_CAPACITY: usize = 64;

/// How completions of overlapping runs are applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RacePolicy {
    /// Every completion is applied; whichever run settles last wins.
    #[default]
    LastSettledWins,

    /// Only the most recently started run may settle the state. Completions
    /// of superseded runs are discarded (their callers still get a result).
    LatestRunWins,
}

/// Settings for one [`AsyncMachine`](crate::effects::AsyncMachine).
///
/// # Example
///
/// ```rust
/// use async_state::config::{MachineConfig, RacePolicy};
///
/// let config = MachineConfig::from_json(r#"{ "race_policy": "latest_run_wins" }"#).unwrap();
/// assert_eq!(config.race_policy, RacePolicy::LatestRunWins);
/// assert_eq!(config.history_capacity, Some(64));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub race_policy: RacePolicy,

    /// Maximum transitions kept in history. `None` keeps everything,
    /// `Some(0)` disables recording.
    pub history_capacity: Option<usize>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            race_policy: RacePolicy::default(),
            history_capacity: Some(DEFAULT_HISTORY_CAPACITY),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid machine configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl MachineConfig {
    /// Parse configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_race_policy(mut self, race_policy: RacePolicy) -> Self {
        self.race_policy = race_policy;
        self
    }

    pub fn with_history_capacity(mut self, capacity: Option<usize>) -> Self {
        self.history_capacity = capacity;
        self
    }
}
