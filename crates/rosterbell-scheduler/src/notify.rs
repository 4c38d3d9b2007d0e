//! Notification events — what the engine hands to the presentation layer.
//! The engine never displays anything; it pushes events through a
//! [`Dispatch`] implementation supplied by the host.

use std::collections::VecDeque;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Category attached to shift reminders.
pub const REMINDER_CATEGORY: &str = "shift_reminder";
/// Category attached to recurrence generation feedback.
pub const RECURRENCE_CATEGORY: &str = "recurrence";

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub message: String,
    pub severity: Severity,
    pub category: String,
}

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl NotificationEvent {
    pub fn new(message: impl Into<String>, severity: Severity, category: &str) -> Self {
        Self {
            message: message.into(),
            severity,
            category: category.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("notification receiver has been dropped")]
    ChannelClosed,
    #[error("dispatch failed: {0}")]
    Failed(String),
}

/// Sink for notification events.
///
/// Dispatch is synchronous: an evaluation pass never suspends mid-way.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, event: &NotificationEvent) -> Result<(), DispatchError>;
}

impl<F> Dispatch for F
where
    F: Fn(&NotificationEvent) -> Result<(), DispatchError> + Send + Sync,
{
    fn dispatch(&self, event: &NotificationEvent) -> Result<(), DispatchError> {
        self(event)
    }
}

/// Forwards events into a tokio channel, for hosts that consume them
/// from an async task.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::UnboundedSender<NotificationEvent>,
}

impl ChannelDispatcher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Dispatch for ChannelDispatcher {
    fn dispatch(&self, event: &NotificationEvent) -> Result<(), DispatchError> {
        self.tx
            .send(event.clone())
            .map_err(|_| DispatchError::ChannelClosed)
    }
}

/// A dispatched event with the local time it went out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedNotification {
    pub event: NotificationEvent,
    pub dispatched_at: NaiveDateTime,
}

/// Bounded in-memory history of dispatched notifications.
#[derive(Debug)]
pub struct NotificationLog {
    entries: VecDeque<LoggedNotification>,
    limit: usize,
}

impl NotificationLog {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit.min(128)),
            limit,
        }
    }

    /// Record a dispatched notification, evicting the oldest beyond the limit.
    pub fn record(&mut self, event: NotificationEvent, dispatched_at: NaiveDateTime) {
        if self.limit == 0 {
            return;
        }
        self.entries.push_back(LoggedNotification {
            event,
            dispatched_at,
        });
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<LoggedNotification> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(100)
    }
}
