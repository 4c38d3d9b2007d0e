//! Reminder tracker — remembers which shifts already got their reminder.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

/// Idempotency ledger keyed by shift ID.
#[derive(Debug, Default)]
pub struct ReminderTracker {
    fired: HashMap<String, NaiveDateTime>,
}

impl ReminderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the reminder for `id` went out at `at`.
    /// Returns `false` if it was already recorded.
    pub fn mark_fired(&mut self, id: &str, at: NaiveDateTime) -> bool {
        if self.fired.contains_key(id) {
            return false;
        }
        self.fired.insert(id.to_string(), at);
        true
    }

    pub fn has_fired(&self, id: &str) -> bool {
        self.fired.contains_key(id)
    }

    pub fn fired_at(&self, id: &str) -> Option<NaiveDateTime> {
        self.fired.get(id).copied()
    }

    /// Forget a single entry, e.g. after a dispatch that did not go through.
    pub fn forget(&mut self, id: &str) -> bool {
        self.fired.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.fired.clear();
    }

    /// Drop entries for shifts that were deleted or already happened.
    /// Returns how many entries were removed.
    pub fn reconcile<F>(&mut self, current_ids: &HashSet<String>, is_past: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let before = self.fired.len();
        self.fired
            .retain(|id, _| current_ids.contains(id) && !is_past(id));
        before - self.fired.len()
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}
