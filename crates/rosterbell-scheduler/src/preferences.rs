//! Preference accessors consumed by the scheduler.

use std::sync::RwLock;

use rosterbell_core::{LeadTime, ReminderPreferences};

/// Returns the user's current reminder preferences.
pub trait PreferenceSource: Send + Sync {
    fn preferences(&self) -> ReminderPreferences;
}

/// Fixed preferences.
impl PreferenceSource for ReminderPreferences {
    fn preferences(&self) -> ReminderPreferences {
        *self
    }
}

/// Preferences the host can change while the scheduler runs.
#[derive(Debug, Default)]
pub struct SharedPreferences {
    inner: RwLock<ReminderPreferences>,
}

impl SharedPreferences {
    pub fn new(prefs: ReminderPreferences) -> Self {
        Self {
            inner: RwLock::new(prefs),
        }
    }

    pub fn set(&self, prefs: ReminderPreferences) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = prefs;
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.write().unwrap_or_else(|e| e.into_inner()).enabled = enabled;
    }

    pub fn set_shift_reminders(&self, enabled: bool) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .shift_reminders = enabled;
    }

    pub fn set_lead_time(&self, lead_time: LeadTime) {
        self.inner.write().unwrap_or_else(|e| e.into_inner()).lead_time = lead_time;
    }
}

impl PreferenceSource for SharedPreferences {
    fn preferences(&self) -> ReminderPreferences {
        *self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_preferences_updates() {
        let prefs = SharedPreferences::default();
        assert!(prefs.preferences().enabled);

        prefs.set_enabled(false);
        prefs.set_lead_time(LeadTime::ThreeHours);
        let snapshot = prefs.preferences();
        assert!(!snapshot.enabled);
        assert!(snapshot.shift_reminders);
        assert_eq!(snapshot.lead_time, LeadTime::ThreeHours);
    }

    #[test]
    fn test_set_replaces_whole_snapshot() {
        let prefs = SharedPreferences::new(ReminderPreferences::default());
        prefs.set(ReminderPreferences {
            enabled: true,
            shift_reminders: false,
            lead_time: LeadTime::TwentyFourHours,
        });
        let snapshot = prefs.preferences();
        assert!(!snapshot.shift_reminders);
        assert_eq!(snapshot.lead_time, LeadTime::TwentyFourHours);
    }
}
