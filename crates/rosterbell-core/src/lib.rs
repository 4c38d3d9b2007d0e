//! # Rosterbell Core
//!
//! Shared building blocks for the Rosterbell reminder engine:
//! configuration loading, the crate-wide error type and the reminder
//! preference types consumed by the scheduler.

pub mod config;
pub mod error;
pub mod prefs;

pub use config::{ReminderDefaults, RosterConfig, SchedulerConfig};
pub use error::{Result, RosterError};
pub use prefs::{LeadTime, ReminderPreferences};
