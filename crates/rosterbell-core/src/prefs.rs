//! Reminder preferences — what the user allows the scheduler to do.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ReminderDefaults;
use crate::error::RosterError;

/// How long before a shift starts a reminder may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LeadTime {
    #[default]
    #[serde(rename = "1hour")]
    OneHour,
    #[serde(rename = "3hours")]
    ThreeHours,
    #[serde(rename = "12hours")]
    TwelveHours,
    #[serde(rename = "24hours")]
    TwentyFourHours,
}

impl LeadTime {
    /// Width of the eligibility window in whole hours.
    pub fn hours(&self) -> i64 {
        match self {
            LeadTime::OneHour => 1,
            LeadTime::ThreeHours => 3,
            LeadTime::TwelveHours => 12,
            LeadTime::TwentyFourHours => 24,
        }
    }

    /// Width of the eligibility window.
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.hours())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadTime::OneHour => "1hour",
            LeadTime::ThreeHours => "3hours",
            LeadTime::TwelveHours => "12hours",
            LeadTime::TwentyFourHours => "24hours",
        }
    }
}

impl fmt::Display for LeadTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadTime {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1hour" => Ok(LeadTime::OneHour),
            "3hours" => Ok(LeadTime::ThreeHours),
            "12hours" => Ok(LeadTime::TwelveHours),
            "24hours" => Ok(LeadTime::TwentyFourHours),
            other => Err(RosterError::Config(format!(
                "Unknown lead time '{other}' (expected 1hour, 3hours, 12hours or 24hours)"
            ))),
        }
    }
}

/// Snapshot of the user's notification preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPreferences {
    /// Master switch for all notifications.
    pub enabled: bool,
    /// Shift reminders specifically.
    #[serde(alias = "reminderTypeEnabled")]
    pub shift_reminders: bool,
    pub lead_time: LeadTime,
}

impl Default for ReminderPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            shift_reminders: true,
            lead_time: LeadTime::OneHour,
        }
    }
}

impl From<&ReminderDefaults> for ReminderPreferences {
    fn from(defaults: &ReminderDefaults) -> Self {
        Self {
            enabled: defaults.enabled,
            shift_reminders: defaults.shift_reminders,
            lead_time: defaults.lead_time,
        }
    }
}
