//! TOML-based application configuration.
//!
//! Stores the standard plan durations and any per-game custom plans.
//! Configuration is stored at `~/.config/refocus/config.toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::data_dir;
use crate::error::ConfigError;
use crate::session::StagePlan;

/// Durations for the standard recovery pipeline, in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    #[serde(default = "default_meditation_min")]
    pub meditation_min: u64,
    #[serde(default = "default_game_min")]
    pub game_min: u64,
    #[serde(default = "default_break_min")]
    pub break_min: u64,
}

fn default_meditation_min() -> u64 {
    5
}
fn default_game_min() -> u64 {
    7
}
fn default_break_min() -> u64 {
    2
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            meditation_min: default_meditation_min(),
            game_min: default_game_min(),
            break_min: default_break_min(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/refocus/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub plan: PlanConfig,
    /// Full stage-table overrides, keyed by game name.
    #[serde(default)]
    pub custom_plans: HashMap<String, StagePlan>,
}

impl Config {
    /// Path of the config file.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be resolved.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, writing and returning the default if absent.
    ///
    /// # Errors
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::read_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save()?;
            Ok(cfg)
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.write_to(&Self::path()?)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// The stage plan for a game: a custom override if configured,
    /// otherwise the standard pipeline built from the configured durations.
    ///
    /// Custom plans come from a hand-editable file and are re-validated
    /// here; an invalid one is logged and ignored.
    pub fn plan_for(&self, game: &str) -> StagePlan {
        if let Some(plan) = self.custom_plans.get(game) {
            match StagePlan::new(plan.name.clone(), plan.stages.clone()) {
                Ok(plan) => return plan,
                Err(err) => {
                    warn!(game = %game, error = %err, "invalid custom plan, using the standard pipeline");
                }
            }
        }
        StagePlan::standard(
            game,
            self.plan.meditation_min.saturating_mul(60_000),
            self.plan.game_min.saturating_mul(60_000),
            self.plan.break_min.saturating_mul(60_000),
        )
    }

    fn read_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
