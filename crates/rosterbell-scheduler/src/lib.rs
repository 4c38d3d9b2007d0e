//! # Rosterbell Scheduler
//!
//! Shift reminder engine and recurrence expander.
//!
//! ## Architecture
//! ```text
//! ReminderScheduler (tokio interval + shift change feed)
//!   ├── ShiftSource        live shift collection, subscribe/unsubscribe
//!   ├── PreferenceSource   enabled / shift reminders / lead time
//!   ├── eligibility        start ∈ (now, now + lead time] ?
//!   ├── ReminderTracker    at-most-once ledger, reconciled on start
//!   └── Dispatch           NotificationEvent → host (toast, channel, …)
//!
//! recurrence::generate (invoked by the host, not the scheduler)
//!   ├── RecurrenceRequest → RecurrenceRule (validated)
//!   ├── expand → ascending dates, from tomorrow, exclusion applied
//!   └── summary NotificationEvent + materialize → new ShiftRecords
//! ```

pub mod clock;
pub mod dates;
pub mod eligibility;
pub mod engine;
pub mod notify;
pub mod preferences;
pub mod recurrence;
pub mod shifts;
pub mod tracker;

pub use clock::{Clock, FakeClock, SystemClock};
pub use engine::{ReminderScheduler, SchedulerError};
pub use notify::{ChannelDispatcher, Dispatch, DispatchError, NotificationEvent, Severity};
pub use preferences::{PreferenceSource, SharedPreferences};
pub use recurrence::{
    Frequency, GenerationOutcome, RecurrenceError, RecurrenceRequest, RecurrenceRule,
};
pub use rosterbell_core::{LeadTime, ReminderPreferences, SchedulerConfig};
pub use shifts::{InMemoryShiftStore, ShiftRecord, ShiftSource, ShiftStatus, SubscriptionId};
pub use tracker::ReminderTracker;
