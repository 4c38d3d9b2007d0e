//! Recurrence expansion — turn one shift into a series of future dates.
//!
//! ```text
//! RecurrenceRequest (raw user input)
//!   → validate()          count in 1..=12, known frequency, weekdays 0..=6
//!   → expand()            tomorrow-onwards dates, exclusion applied, sorted
//!   → generate()          dates + summary notification
//!   → materialize()       new ShiftRecords for the host to insert
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dates;
use crate::notify::{NotificationEvent, RECURRENCE_CATEGORY, Severity};
use crate::shifts::ShiftRecord;

pub const MIN_OCCURRENCES: u32 = 1;
pub const MAX_OCCURRENCES: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecurrenceError {
    #[error("occurrence count {0} is outside 1..=12")]
    OccurrenceCountOutOfRange(u32),
    #[error("unknown frequency '{0}' (expected daily or weekly)")]
    UnknownFrequency(String),
    #[error("weekday index {0} is outside 0..=6")]
    InvalidWeekday(u8),
}

/// How often the pattern repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
}

impl FromStr for Frequency {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            _ => Err(RecurrenceError::UnknownFrequency(s.to_string())),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
        }
    }
}

/// Unvalidated recurrence input as it arrives from a form or API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRequest {
    pub frequency: String,
    pub occurrence_count: u32,
    #[serde(default)]
    pub weekdays: Vec<u8>,
}

impl RecurrenceRequest {
    pub fn validate(&self) -> Result<RecurrenceRule, RecurrenceError> {
        let frequency: Frequency = self.frequency.parse()?;
        RecurrenceRule::new(frequency, self.occurrence_count, self.weekdays.iter().copied())
    }
}

/// A validated recurrence pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    frequency: Frequency,
    occurrence_count: u32,
    weekdays: BTreeSet<u8>,
}

impl RecurrenceRule {
    /// Duplicate weekday entries collapse into one.
    pub fn new<I>(frequency: Frequency, occurrence_count: u32, weekdays: I) -> Result<Self, RecurrenceError>
    where
        I: IntoIterator<Item = u8>,
    {
        if !(MIN_OCCURRENCES..=MAX_OCCURRENCES).contains(&occurrence_count) {
            return Err(RecurrenceError::OccurrenceCountOutOfRange(occurrence_count));
        }
        let weekdays: BTreeSet<u8> = weekdays.into_iter().collect();
        if let Some(&bad) = weekdays.iter().find(|&&w| w > 6) {
            return Err(RecurrenceError::InvalidWeekday(bad));
        }
        Ok(Self {
            frequency,
            occurrence_count,
            weekdays,
        })
    }

    pub fn daily(occurrence_count: u32) -> Result<Self, RecurrenceError> {
        Self::new(Frequency::Daily, occurrence_count, [])
    }

    pub fn weekly<I>(occurrence_count: u32, weekdays: I) -> Result<Self, RecurrenceError>
    where
        I: IntoIterator<Item = u8>,
    {
        Self::new(Frequency::Weekly, occurrence_count, weekdays)
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn occurrence_count(&self) -> u32 {
        self.occurrence_count
    }

    pub fn weekdays(&self) -> &BTreeSet<u8> {
        &self.weekdays
    }
}

/// Expand `rule` forward from the day after `anchor`.
///
/// The anchor's own date is never produced, nor is `exclude`. `NaiveDate`
/// arithmetic is calendar-exact, so there is no time-of-day drift to guard
/// against around DST changes. Output is strictly ascending.
pub fn expand(anchor: NaiveDate, rule: &RecurrenceRule, exclude: NaiveDate) -> Vec<NaiveDate> {
    let Some(start) = dates::tomorrow(anchor) else {
        return Vec::new();
    };
    let count = u64::from(rule.occurrence_count);

    let mut out: Vec<NaiveDate> = match rule.frequency {
        Frequency::Daily => (0..count)
            .filter_map(|i| dates::add_days(start, i))
            .collect(),
        Frequency::Weekly => {
            let start_wd = dates::weekday_index(start);
            let targets: Vec<u8> = if rule.weekdays.is_empty() {
                vec![start_wd]
            } else {
                rule.weekdays.iter().copied().collect()
            };
            let mut dates_out = Vec::with_capacity(targets.len() * count as usize);
            for week in 0..count {
                for &w in &targets {
                    let offset = dates::forward_offset(start_wd, w) + week * 7;
                    if let Some(date) = dates::add_days(start, offset) {
                        dates_out.push(date);
                    }
                }
            }
            dates_out
        }
    };

    out.retain(|d| *d != exclude);
    out.sort_unstable();
    out.dedup();
    out
}

/// Result of running a recurrence request end to end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationOutcome {
    pub dates: Vec<NaiveDate>,
    pub message: String,
    pub severity: Severity,
}

impl GenerationOutcome {
    fn from_dates(dates: Vec<NaiveDate>) -> Self {
        if dates.is_empty() {
            Self {
                dates,
                message: "No valid dates generated. Please check your pattern.".to_string(),
                severity: Severity::Warning,
            }
        } else {
            Self {
                message: format!("Generated {} dates for recurring pattern", dates.len()),
                severity: Severity::Success,
                dates,
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn to_event(&self) -> NotificationEvent {
        NotificationEvent::new(self.message.clone(), self.severity, RECURRENCE_CATEGORY)
    }
}

/// Validate `request`, expand it, and summarise the result.
///
/// An empty expansion is a warning, not an error.
pub fn generate(
    anchor: NaiveDate,
    request: &RecurrenceRequest,
    exclude: NaiveDate,
) -> Result<GenerationOutcome, RecurrenceError> {
    let rule = request.validate()?;
    let dates = expand(anchor, &rule, exclude);
    tracing::info!(
        "🔁 Expanded {} rule from {}: {} date(s)",
        rule.frequency,
        anchor,
        dates.len()
    );
    Ok(GenerationOutcome::from_dates(dates))
}

/// Copies of `anchor` placed on each of `dates`, with fresh IDs.
pub fn materialize(anchor: &ShiftRecord, dates: &[NaiveDate]) -> Vec<ShiftRecord> {
    dates
        .iter()
        .map(|&date| ShiftRecord {
            id: uuid::Uuid::new_v4().to_string(),
            date,
            ..anchor.clone()
        })
        .collect()
}
