//! Rosterbell configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, RosterError};
use crate::prefs::LeadTime;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub reminders: ReminderDefaults,
}

impl RosterConfig {
    /// Load config from the default path (~/.rosterbell/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RosterError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RosterError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        tracing::debug!("⚙️ Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| RosterError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.poll_interval_secs == 0 {
            return Err(RosterError::Config(
                "scheduler.poll_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Rosterbell home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rosterbell")
    }
}

/// Scheduler service tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Period of the re-evaluation timer.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// How many dispatched notifications to keep in memory.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Never remind about canceled shifts.
    #[serde(default = "bool_true")]
    pub skip_canceled: bool,
}

fn default_poll_interval() -> u64 { 60 }
fn default_history_limit() -> usize { 100 }
fn bool_true() -> bool { true }

impl SchedulerConfig {
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            history_limit: default_history_limit(),
            skip_canceled: true,
        }
    }
}

/// Initial reminder preferences, used when the host has none stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderDefaults {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "bool_true")]
    pub shift_reminders: bool,
    #[serde(default)]
    pub lead_time: LeadTime,
}

impl Default for ReminderDefaults {
    fn default() -> Self {
        Self {
            enabled: true,
            shift_reminders: true,
            lead_time: LeadTime::OneHour,
        }
    }
}
