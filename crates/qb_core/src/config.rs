//! # Engine Configuration
//!
//! Every tuning constant of the rotation engine in one place.
//!
//! ## Usage
//! ```rust
//! use qb_core::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! assert_eq!(config.field_capacity, 4);
//!
//! let yaml = "roster_size: 10\nteam_name: Otters\n";
//! let custom = EngineConfig::from_yaml_str(yaml).unwrap();
//! assert_eq!(custom.roster_size, 10);
//! assert_eq!(custom.quarter_length_secs, 600);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Storage key the persisted blob lives under.
pub const DEFAULT_STORAGE_KEY: &str = "quickBenchState";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Roster ===
    /// Players created on a new game (default: 8)
    pub roster_size: u32,
    /// Maximum simultaneous on-field players (default: 4)
    pub field_capacity: usize,
    /// Team name used for a fresh game
    pub team_name: String,

    // === Clock ===
    /// Countdown length of one quarter in seconds (default: 600)
    pub quarter_length_secs: u32,

    // === Fatigue ===
    /// Fatigue counter at which a player is shown as fatigued (default: 30)
    pub fatigue_threshold: u32,

    // === On-fire streak ===
    /// Trailing window in match seconds (default: 120)
    pub on_fire_window_secs: u32,
    /// Goals inside the window needed to catch fire (default: 3)
    pub on_fire_goal_count: usize,
    /// Ticks an on-fire player stays hot without scoring (default: 30)
    pub on_fire_cooldown_ticks: u32,

    // === Bookkeeping ===
    /// Activity log entries kept, newest first (default: 50)
    pub activity_log_capacity: usize,
    /// Undo snapshots kept (default: 10)
    pub history_depth: usize,
    /// Key of the persisted blob in the external store
    pub storage_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            roster_size: 8,
            field_capacity: 4,
            team_name: String::new(),

            quarter_length_secs: 600,

            fatigue_threshold: 30,

            on_fire_window_secs: 120,
            on_fire_goal_count: 3,
            on_fire_cooldown_ticks: 30,

            activity_log_capacity: 50,
            history_depth: 10,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a YAML document; missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&yaml)?;
        log::debug!("Loaded engine config from {:?}", path);
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check the relations the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field_capacity == 0 {
            return Err(invalid("field_capacity", "must be at least 1"));
        }
        if self.roster_size as usize <= self.field_capacity {
            return Err(invalid(
                "roster_size",
                format!("must exceed field_capacity ({})", self.field_capacity),
            ));
        }
        if self.quarter_length_secs == 0 {
            return Err(invalid("quarter_length_secs", "must be at least 1"));
        }
        if self.on_fire_goal_count == 0 {
            return Err(invalid("on_fire_goal_count", "must be at least 1"));
        }
        if self.activity_log_capacity == 0 {
            return Err(invalid("activity_log_capacity", "must be at least 1"));
        }
        if self.storage_key.trim().is_empty() {
            return Err(invalid("storage_key", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.into() }
}
