//! Reminder scheduler — watches the shift collection and fires one reminder
//! per shift once it enters the lead-time window.
//!
//! Two triggers drive the same evaluation pass:
//! - a `tokio::time::interval` ticker (every `poll_interval_secs`, 60s by default)
//! - the shift collection's change feed, but only when the number of shifts
//!   changes. An in-place edit of a shift's time is picked up by the next tick.
//!
//! No pass ever awaits. Locks are held only for tracker/log bookkeeping and
//! never across a dispatch, so a dispatcher may mutate the shift collection.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use rosterbell_core::SchedulerConfig;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::eligibility;
use crate::notify::{
    Dispatch, DispatchError, LoggedNotification, NotificationEvent, NotificationLog,
    REMINDER_CATEGORY, Severity,
};
use crate::preferences::PreferenceSource;
use crate::shifts::{ShiftRecord, ShiftSource, ShiftStatus, SubscriptionId};
use crate::tracker::ReminderTracker;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no tokio runtime available to drive the reminder timer")]
    NoRuntime,
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// The reminder scheduler service. Owned by the host; stopped on drop.
pub struct ReminderScheduler {
    inner: Arc<Inner>,
    run: Mutex<Option<RunHandle>>,
}

struct RunHandle {
    ticker: JoinHandle<()>,
    subscription: SubscriptionId,
}

struct Inner {
    shifts: Arc<dyn ShiftSource>,
    prefs: Arc<dyn PreferenceSource>,
    dispatcher: Arc<dyn Dispatch>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    tracker: Mutex<ReminderTracker>,
    log: Mutex<NotificationLog>,
    /// Collection size seen by the last change-feed callback.
    last_count: AtomicUsize,
}

impl ReminderScheduler {
    pub fn new(
        shifts: Arc<dyn ShiftSource>,
        prefs: Arc<dyn PreferenceSource>,
        dispatcher: Arc<dyn Dispatch>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        let log = NotificationLog::new(config.history_limit);
        Self {
            inner: Arc::new(Inner {
                shifts,
                prefs,
                dispatcher,
                clock,
                config,
                tracker: Mutex::new(ReminderTracker::new()),
                log: Mutex::new(log),
                last_count: AtomicUsize::new(0),
            }),
            run: Mutex::new(None),
        }
    }

    /// Start watching. Restarts cleanly if already running.
    ///
    /// Reconciles the tracker, runs one pass immediately, then registers the
    /// ticker and the change-feed subscription. A dispatch failure during the
    /// immediate pass is returned and leaves the scheduler stopped.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        self.stop();

        let removed = self.inner.reconcile();
        if removed > 0 {
            tracing::debug!("🧹 Dropped {removed} stale reminder entries");
        }

        let fired = self.inner.evaluate_all()?;

        let period = self.inner.config.poll_interval();
        let ticker = handle.spawn(run_ticker(Arc::downgrade(&self.inner), period));

        let weak = Arc::downgrade(&self.inner);
        let subscription = self.inner.shifts.subscribe(Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_shifts_changed();
            }
        }));
        // Read after subscribing: the immediate pass may have changed the collection.
        self.inner
            .last_count
            .store(self.inner.shifts.len(), Ordering::SeqCst);

        *self.run_slot() = Some(RunHandle {
            ticker,
            subscription,
        });
        tracing::info!(
            "⏰ Reminder scheduler started (check every {}s, {} fired on start)",
            period.as_secs(),
            fired
        );
        Ok(())
    }

    /// Cancel the ticker and the subscription. Safe to call at any time.
    pub fn stop(&self) {
        let Some(run) = self.run_slot().take() else {
            return;
        };
        run.ticker.abort();
        self.inner.shifts.unsubscribe(run.subscription);
        tracing::info!("⏹️ Reminder scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.run_slot().is_some()
    }

    /// Check one shift now. Returns whether a reminder was dispatched.
    pub fn evaluate_one(&self, shift: &ShiftRecord) -> Result<bool, SchedulerError> {
        Ok(self.inner.evaluate_one(shift)?)
    }

    /// Check every shift in the collection. Returns how many reminders fired.
    pub fn evaluate_all(&self) -> Result<usize, SchedulerError> {
        Ok(self.inner.evaluate_all()?)
    }

    /// Forget reminders for deleted or past shifts. Returns entries removed.
    pub fn reconcile(&self) -> usize {
        self.inner.reconcile()
    }

    /// Forget every fired reminder.
    pub fn clear_reminders(&self) {
        self.inner.tracker().clear();
    }

    pub fn has_fired(&self, shift_id: &str) -> bool {
        self.inner.tracker().has_fired(shift_id)
    }

    pub fn tracked_count(&self) -> usize {
        self.inner.tracker().len()
    }

    /// Dispatched reminders, oldest first.
    pub fn history(&self) -> Vec<LoggedNotification> {
        self.inner.log.lock().unwrap_or_else(|e| e.into_inner()).entries()
    }

    fn run_slot(&self) -> MutexGuard<'_, Option<RunHandle>> {
        self.run.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Inner {
    fn tracker(&self) -> MutexGuard<'_, ReminderTracker> {
        self.tracker.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn reminders_allowed(&self) -> bool {
        let prefs = self.prefs.preferences();
        prefs.enabled && prefs.shift_reminders
    }

    fn evaluate_one(&self, shift: &ShiftRecord) -> Result<bool, DispatchError> {
        let prefs = self.prefs.preferences();
        if !prefs.enabled || !prefs.shift_reminders {
            return Ok(false);
        }
        if self.config.skip_canceled && shift.status == ShiftStatus::Canceled {
            return Ok(false);
        }
        if self.tracker().has_fired(&shift.id) {
            return Ok(false);
        }

        let now = self.clock.now();
        if !eligibility::is_eligible(now, shift, prefs.lead_time) {
            return Ok(false);
        }

        // Reserve before dispatching so a re-entrant pass cannot fire twice.
        if !self.tracker().mark_fired(&shift.id, now) {
            return Ok(false);
        }

        let event = NotificationEvent::new(
            eligibility::reminder_message(now, shift),
            Severity::Info,
            REMINDER_CATEGORY,
        );
        if let Err(e) = self.dispatcher.dispatch(&event) {
            self.tracker().forget(&shift.id);
            tracing::warn!("⚠️ Reminder dispatch failed for shift {}: {e}", shift.id);
            return Err(e);
        }

        tracing::info!("🔔 Reminder sent for shift {} ({} on {})", shift.id, shift.role, shift.date);
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .record(event, now);
        Ok(true)
    }

    fn evaluate_all(&self) -> Result<usize, DispatchError> {
        if !self.reminders_allowed() {
            return Ok(0);
        }

        let shifts = self.shifts.shifts();
        let mut fired = 0;
        for shift in &shifts {
            if self.tracker().has_fired(&shift.id) {
                continue;
            }
            if self.evaluate_one(shift)? {
                fired += 1;
            }
        }
        tracing::debug!("🔍 Reminder pass over {} shifts: {} fired", shifts.len(), fired);
        Ok(fired)
    }

    fn reconcile(&self) -> usize {
        let today = self.clock.now().date();
        let shifts = self.shifts.shifts();
        let current: HashSet<String> = shifts.iter().map(|s| s.id.clone()).collect();
        let past: HashSet<&str> = shifts
            .iter()
            .filter(|s| s.is_before(today))
            .map(|s| s.id.as_str())
            .collect();
        self.tracker().reconcile(&current, |id| past.contains(id))
    }

    fn on_shifts_changed(&self) {
        let count = self.shifts.len();
        let previous = self.last_count.swap(count, Ordering::SeqCst);
        if count == previous {
            return;
        }
        tracing::debug!("📋 Shift count changed {previous} → {count}, re-evaluating");
        if count < previous {
            let removed = self.reconcile();
            if removed > 0 {
                tracing::debug!("🧹 Dropped {removed} reminder entries for removed shifts");
            }
        }
        if let Err(e) = self.evaluate_all() {
            tracing::warn!("⚠️ Reminder pass after shift change failed: {e}");
        }
    }
}

async fn run_ticker(inner: Weak<Inner>, period: std::time::Duration) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let Some(inner) = inner.upgrade() else {
            break;
        };
        if let Err(e) = inner.evaluate_all() {
            tracing::warn!("⚠️ Periodic reminder pass failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::preferences::SharedPreferences;
    use crate::shifts::InMemoryShiftStore;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use rosterbell_core::ReminderPreferences;
    use std::sync::atomic::AtomicBool;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<NotificationEvent>>,
        fail: AtomicBool,
    }

    impl Recorder {
        fn count(&self) -> usize {
            self.events.lock().unwrap().len()
        }
    }

    impl Dispatch for Recorder {
        fn dispatch(&self, event: &NotificationEvent) -> Result<(), DispatchError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(DispatchError::Failed("toast service down".into()));
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Fixture {
        scheduler: ReminderScheduler,
        store: Arc<InMemoryShiftStore>,
        recorder: Arc<Recorder>,
        clock: FakeClock,
        prefs: Arc<SharedPreferences>,
    }

    fn nine_am() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 5)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn shift(id: &str, day: u32, h: u32, m: u32) -> ShiftRecord {
        ShiftRecord::new(
            id,
            "Alex",
            "Barista",
            NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        )
    }

    fn fixture(shifts: Vec<ShiftRecord>) -> Fixture {
        let store = Arc::new(InMemoryShiftStore::with_shifts(shifts));
        let recorder = Arc::new(Recorder::default());
        let clock = FakeClock::new(nine_am());
        let prefs = Arc::new(SharedPreferences::new(ReminderPreferences::default()));
        let scheduler = ReminderScheduler::new(
            store.clone(),
            prefs.clone(),
            recorder.clone(),
            Arc::new(clock.clone()),
            SchedulerConfig::default(),
        );
        Fixture {
            scheduler,
            store,
            recorder,
            clock,
            prefs,
        }
    }

    #[test]
    fn test_evaluate_one_fires_at_most_once() {
        let f = fixture(vec![]);
        let s = shift("s1", 5, 9, 45);
        assert!(f.scheduler.evaluate_one(&s).unwrap());
        for _ in 0..5 {
            assert!(!f.scheduler.evaluate_one(&s).unwrap());
        }
        assert_eq!(f.recorder.count(), 1);
        assert!(f.scheduler.has_fired("s1"));

        let events = f.recorder.events.lock().unwrap();
        assert_eq!(
            events[0].message,
            "Reminder: you have a shift as Barista starting at 09:45 (in 45 minutes)"
        );
        assert_eq!(events[0].severity, Severity::Info);
        assert_eq!(events[0].category, REMINDER_CATEGORY);
    }

    #[test]
    fn test_clear_allows_refire() {
        let f = fixture(vec![]);
        let s = shift("s1", 5, 9, 45);
        f.scheduler.evaluate_one(&s).unwrap();
        f.scheduler.clear_reminders();
        assert!(f.scheduler.evaluate_one(&s).unwrap());
        assert_eq!(f.recorder.count(), 2);
    }

    #[test]
    fn test_outside_window_waits_for_later_pass() {
        let f = fixture(vec![shift("s1", 5, 11, 30)]);
        assert_eq!(f.scheduler.evaluate_all().unwrap(), 0);

        f.clock.advance(chrono::Duration::minutes(100));
        assert_eq!(f.scheduler.evaluate_all().unwrap(), 1);
        assert_eq!(f.scheduler.evaluate_all().unwrap(), 0);
        assert_eq!(f.recorder.count(), 1);
    }

    #[test]
    fn test_preferences_short_circuit() {
        let f = fixture(vec![shift("s1", 5, 9, 30)]);
        f.prefs.set_enabled(false);
        assert_eq!(f.scheduler.evaluate_all().unwrap(), 0);

        f.prefs.set_enabled(true);
        f.prefs.set_shift_reminders(false);
        assert!(!f.scheduler.evaluate_one(&shift("s1", 5, 9, 30)).unwrap());
        assert_eq!(f.recorder.count(), 0);
        assert_eq!(f.scheduler.tracked_count(), 0);

        f.prefs.set_shift_reminders(true);
        assert_eq!(f.scheduler.evaluate_all().unwrap(), 1);
    }

    #[test]
    fn test_canceled_shifts_are_skipped() {
        let f = fixture(vec![shift("s1", 5, 9, 30).with_status(ShiftStatus::Canceled)]);
        assert_eq!(f.scheduler.evaluate_all().unwrap(), 0);
        assert_eq!(f.recorder.count(), 0);
    }

    #[test]
    fn test_dispatch_failure_propagates_and_is_retried() {
        let f = fixture(vec![]);
        let s = shift("s1", 5, 9, 30);
        f.recorder.fail.store(true, Ordering::SeqCst);

        let err = f.scheduler.evaluate_one(&s).unwrap_err();
        assert!(matches!(err, SchedulerError::Dispatch(DispatchError::Failed(_))));
        assert!(!f.scheduler.has_fired("s1"));

        f.recorder.fail.store(false, Ordering::SeqCst);
        assert!(f.scheduler.evaluate_one(&s).unwrap());
    }

    #[test]
    fn test_evaluate_all_stops_at_first_failure() {
        let f = fixture(vec![shift("a", 5, 9, 30), shift("b", 5, 9, 40)]);
        f.recorder.fail.store(true, Ordering::SeqCst);
        assert!(f.scheduler.evaluate_all().is_err());
        assert_eq!(f.scheduler.tracked_count(), 0);
    }

    #[test]
    fn test_reconcile_drops_deleted_and_past() {
        let f = fixture(vec![shift("a", 5, 9, 30), shift("b", 5, 9, 40), shift("c", 5, 9, 50)]);
        assert_eq!(f.scheduler.evaluate_all().unwrap(), 3);

        f.store.remove("b");
        assert_eq!(f.scheduler.reconcile(), 1);
        assert!(!f.scheduler.has_fired("b"));
        assert_eq!(f.scheduler.tracked_count(), 2);

        f.clock.set(nine_am() + chrono::Duration::days(1));
        assert_eq!(f.scheduler.reconcile(), 2);
        assert_eq!(f.scheduler.tracked_count(), 0);
    }

    #[test]
    fn test_history_records_dispatched() {
        let f = fixture(vec![shift("a", 5, 9, 30)]);
        f.scheduler.evaluate_all().unwrap();
        let history = f.scheduler.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].dispatched_at, nine_am());
    }

    #[test]
    fn test_start_without_runtime() {
        let f = fixture(vec![]);
        assert!(matches!(f.scheduler.start(), Err(SchedulerError::NoRuntime)));
        assert!(!f.scheduler.is_running());
    }

    #[tokio::test]
    async fn test_start_runs_immediate_pass() {
        let f = fixture(vec![shift("a", 5, 9, 30), shift("later", 5, 15, 0)]);
        f.scheduler.start().unwrap();
        assert!(f.scheduler.is_running());
        assert_eq!(f.recorder.count(), 1);
        assert!(f.scheduler.has_fired("a"));
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let f = fixture(vec![]);
        f.scheduler.start().unwrap();
        f.scheduler.start().unwrap();
        assert_eq!(f.store.listener_count(), 1);

        f.scheduler.stop();
        f.scheduler.stop();
        assert_eq!(f.store.listener_count(), 0);
        assert!(!f.scheduler.is_running());
    }

    #[test]
    fn test_stop_when_never_started() {
        let f = fixture(vec![]);
        f.scheduler.stop();
        assert!(!f.scheduler.is_running());
    }

    #[tokio::test]
    async fn test_added_shift_triggers_evaluation() {
        let f = fixture(vec![]);
        f.scheduler.start().unwrap();

        f.store.add(shift("new", 5, 9, 20));
        assert_eq!(f.recorder.count(), 1);
        assert!(f.scheduler.has_fired("new"));
    }

    #[tokio::test]
    async fn test_in_place_edit_waits_for_count_change() {
        let f = fixture(vec![shift("a", 5, 11, 30)]);
        f.scheduler.start().unwrap();
        assert_eq!(f.recorder.count(), 0);

        // Same count, earlier start: not re-evaluated yet.
        f.store
            .update("a", |s| s.start_time = NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(f.recorder.count(), 0);

        // Any count change re-runs the full pass.
        f.store.add(shift("b", 6, 9, 0));
        assert_eq!(f.recorder.count(), 1);
        assert!(f.scheduler.has_fired("a"));
    }

    #[tokio::test]
    async fn test_start_failure_leaves_scheduler_stopped() {
        let f = fixture(vec![shift("a", 5, 9, 30)]);
        f.recorder.fail.store(true, Ordering::SeqCst);
        assert!(matches!(f.scheduler.start(), Err(SchedulerError::Dispatch(_))));
        assert!(!f.scheduler.is_running());
        assert_eq!(f.store.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let f = fixture(vec![]);
        f.scheduler.start().unwrap();
        let store = f.store.clone();
        drop(f);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_removed_shift_is_forgotten_while_running() {
        let f = fixture(vec![shift("a", 5, 9, 30), shift("b", 5, 9, 45)]);
        f.scheduler.start().unwrap();
        assert_eq!(f.scheduler.tracked_count(), 2);

        f.store.remove("b");
        assert_eq!(f.scheduler.tracked_count(), 1);
        assert!(!f.scheduler.has_fired("b"));
        assert!(f.scheduler.has_fired("a"));
    }

    #[tokio::test]
    async fn test_same_size_replace_waits_for_tick() {
        let f = fixture(vec![shift("a", 5, 11, 30)]);
        f.scheduler.start().unwrap();

        f.store.replace_all(vec![shift("b", 5, 9, 30)]);
        assert_eq!(f.recorder.count(), 0);

        f.store.replace_all(vec![shift("b", 5, 9, 30), shift("c", 5, 15, 0)]);
        assert_eq!(f.recorder.count(), 1);
        assert!(f.scheduler.has_fired("b"));
    }

    #[tokio::test]
    async fn test_collection_changed_during_start_pass_is_counted() {
        let store = Arc::new(InMemoryShiftStore::with_shifts(vec![
            shift("a", 5, 9, 30),
            shift("late", 5, 11, 30),
        ]));
        let clock = FakeClock::new(nine_am());
        let sent = Arc::new(AtomicUsize::new(0));
        let added = AtomicBool::new(false);
        let (st, n) = (Arc::downgrade(&store), sent.clone());
        let dispatch = move |_: &NotificationEvent| -> Result<(), DispatchError> {
            // The first reminder adds a far-off shift to the collection.
            if !added.swap(true, Ordering::SeqCst) {
                if let Some(store) = st.upgrade() {
                    store.add(shift("extra", 20, 9, 0));
                }
            }
            n.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let scheduler = ReminderScheduler::new(
            store.clone(),
            Arc::new(ReminderPreferences::default()),
            Arc::new(dispatch),
            Arc::new(clock.clone()),
            SchedulerConfig::default(),
        );
        scheduler.start().unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(sent.load(Ordering::SeqCst), 1);

        // Back to the pre-start size: still a change from what the feed last saw.
        clock.set(nine_am() + chrono::Duration::minutes(105));
        store.remove("extra");
        assert_eq!(sent.load(Ordering::SeqCst), 2);
        assert!(scheduler.has_fired("late"));
    }
}
