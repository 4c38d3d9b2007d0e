//! Shift definitions and the shift collection the scheduler watches.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::dates;

/// A scheduled work assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftRecord {
    /// Unique shift ID.
    pub id: String,
    pub employee_name: String,
    pub role: String,
    /// Local calendar date, `YYYY-MM-DD` on the wire.
    pub date: NaiveDate,
    #[serde(with = "dates::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "dates::hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub status: ShiftStatus,
}

/// Shift status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftStatus {
    Confirmed,
    #[default]
    Pending,
    Canceled,
}

impl ShiftRecord {
    pub fn new(
        id: &str,
        employee_name: &str,
        role: &str,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            id: id.to_string(),
            employee_name: employee_name.to_string(),
            role: role.to_string(),
            date,
            start_time,
            end_time,
            status: ShiftStatus::Pending,
        }
    }

    pub fn with_status(mut self, status: ShiftStatus) -> Self {
        self.status = status;
        self
    }

    /// The local instant the shift begins.
    pub fn starts_at(&self) -> NaiveDateTime {
        dates::combine(self.date, self.start_time)
    }

    /// Whether the shift's date lies strictly before `today`.
    pub fn is_before(&self, today: NaiveDate) -> bool {
        self.date < today
    }
}

/// Identifies one change-feed registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Callback invoked after any mutation of the shift collection.
pub type ShiftListener = Arc<dyn Fn() + Send + Sync>;

/// Read access to the live shift collection plus its change feed.
///
/// Listeners must be invoked after the mutation is visible through
/// [`ShiftSource::shifts`] and without holding any lock the listener could
/// need to read the collection.
pub trait ShiftSource: Send + Sync {
    /// Snapshot of all current shifts.
    fn shifts(&self) -> Vec<ShiftRecord>;

    /// Number of shifts currently in the collection.
    fn len(&self) -> usize {
        self.shifts().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find(&self, id: &str) -> Option<ShiftRecord> {
        self.shifts().into_iter().find(|s| s.id == id)
    }

    fn subscribe(&self, listener: ShiftListener) -> SubscriptionId;

    /// Returns `false` when `id` was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// In-memory shift collection with a synchronous change feed.
#[derive(Default)]
pub struct InMemoryShiftStore {
    shifts: RwLock<Vec<ShiftRecord>>,
    listeners: Mutex<Vec<(SubscriptionId, ShiftListener)>>,
    next_id: AtomicU64,
}

impl InMemoryShiftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shifts(shifts: Vec<ShiftRecord>) -> Self {
        Self {
            shifts: RwLock::new(shifts),
            ..Self::default()
        }
    }

    /// Add a shift.
    pub fn add(&self, shift: ShiftRecord) {
        tracing::debug!("📅 Shift added: {} ({} {})", shift.id, shift.date, shift.role);
        self.write().push(shift);
        self.notify();
    }

    /// Remove a shift by ID.
    pub fn remove(&self, id: &str) -> Option<ShiftRecord> {
        let removed = {
            let mut shifts = self.write();
            let pos = shifts.iter().position(|s| s.id == id)?;
            shifts.remove(pos)
        };
        self.notify();
        Some(removed)
    }

    /// Edit a shift in place. Returns `false` when no shift has that ID.
    pub fn update<F>(&self, id: &str, edit: F) -> bool
    where
        F: FnOnce(&mut ShiftRecord),
    {
        let found = {
            let mut shifts = self.write();
            match shifts.iter_mut().find(|s| s.id == id) {
                Some(shift) => {
                    edit(shift);
                    true
                }
                None => false,
            }
        };
        if found {
            self.notify();
        }
        found
    }

    /// Swap the whole collection.
    pub fn replace_all(&self, shifts: Vec<ShiftRecord>) {
        *self.write() = shifts;
        self.notify();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<ShiftRecord>> {
        self.shifts.write().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self) {
        // Snapshot so listeners run with no store lock held.
        let listeners: Vec<ShiftListener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

impl ShiftSource for InMemoryShiftStore {
    fn shifts(&self) -> Vec<ShiftRecord> {
        self.shifts.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn len(&self) -> usize {
        self.shifts.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn find(&self, id: &str) -> Option<ShiftRecord> {
        self.shifts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    fn subscribe(&self, listener: ShiftListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        let len = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() < len
    }
}
