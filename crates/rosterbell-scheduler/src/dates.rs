//! Calendar helpers shared by the recurrence expander and the scheduler.
//!
//! Weekday indices follow the Sunday = 0 … Saturday = 6 convention.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};

/// Wire format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Wire format for times of day.
pub const TIME_FORMAT: &str = "%H:%M";

/// Weekday index of `date`, Sunday = 0.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// The day after `date`, or `None` past the end of the calendar.
pub fn tomorrow(date: NaiveDate) -> Option<NaiveDate> {
    date.succ_opt()
}

/// `date` moved forward by `days` calendar days.
pub fn add_days(date: NaiveDate, days: u64) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(days))
}

/// Days to walk forward from weekday `from` to reach weekday `to`, in `0..=6`.
///
/// Keep the explicit branch. Folding it into a single `% 7` expression has
/// already rolled Saturday targets into the wrong week once.
pub fn forward_offset(from: u8, to: u8) -> u64 {
    if to >= from {
        u64::from(to - from)
    } else {
        u64::from(7 - (from - to))
    }
}

/// Combine a calendar date and a time of day into one local instant.
pub fn combine(date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
    date.and_time(time)
}

pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
}

/// Parse `HH:MM`, tolerating a trailing `:SS`.
pub fn parse_time(s: &str) -> Result<NaiveTime, chrono::ParseError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, TIME_FORMAT).or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Serde adapter storing a `NaiveTime` as `HH:MM`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw)
            .map_err(|e| serde::de::Error::custom(format!("invalid time '{raw}': {e}")))
    }
}
