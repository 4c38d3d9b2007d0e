//! Reminder eligibility — should a shift's reminder fire right now?

use chrono::{Duration, NaiveDateTime};
use rosterbell_core::LeadTime;

use crate::dates;
use crate::shifts::ShiftRecord;

/// A shift is eligible when its start lies in `(now, now + lead_time]`.
///
/// Shifts at or before `now` never qualify, and shifts further out than the
/// window only qualify on a later pass.
pub fn is_eligible(now: NaiveDateTime, shift: &ShiftRecord, lead_time: LeadTime) -> bool {
    let until = time_until(now, shift);
    until > Duration::zero() && until <= lead_time.window()
}

/// Signed time from `now` to the shift's start.
pub fn time_until(now: NaiveDateTime, shift: &ShiftRecord) -> Duration {
    shift.starts_at() - now
}

/// "in 45 minutes", "in 1 hour", "in 2 hours and 5 minutes".
pub fn describe_relative(until: Duration) -> String {
    // Whole minutes, truncated, so 59m40s still reads as minutes; never below one.
    let minutes = until.num_minutes().max(1);
    if minutes < 60 {
        return format!("in {}", plural(minutes, "minute"));
    }
    let (h, m) = (minutes / 60, minutes % 60);
    if m == 0 {
        format!("in {}", plural(h, "hour"))
    } else {
        format!("in {} and {}", plural(h, "hour"), plural(m, "minute"))
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Reminder text for `shift` as seen from `now`.
pub fn reminder_message(now: NaiveDateTime, shift: &ShiftRecord) -> String {
    format!(
        "Reminder: you have a shift as {} starting at {} ({})",
        shift.role,
        dates::format_time(shift.start_time),
        describe_relative(time_until(now, shift))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 5)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn shift_at(date: (i32, u32, u32), h: u32, m: u32) -> ShiftRecord {
        ShiftRecord::new(
            "s1",
            "Alex",
            "Barista",
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_window_one_hour() {
        let lt = LeadTime::OneHour;
        assert!(is_eligible(now(), &shift_at((2024, 6, 5), 9, 45), lt));
        assert!(!is_eligible(now(), &shift_at((2024, 6, 5), 10, 30), lt));
        assert!(!is_eligible(now(), &shift_at((2024, 6, 5), 8, 55), lt));
    }

    #[test]
    fn test_documented_examples() {
        assert!(is_eligible(now(), &shift_at((2024, 6, 5), 9, 55), LeadTime::OneHour));
        assert!(!is_eligible(now(), &shift_at((2024, 6, 5), 11, 30), LeadTime::OneHour));
    }

    #[test]
    fn test_window_bounds() {
        // Start exactly at now: not eligible.
        assert!(!is_eligible(now(), &shift_at((2024, 6, 5), 9, 0), LeadTime::OneHour));
        // Start exactly at the window edge: eligible.
        assert!(is_eligible(now(), &shift_at((2024, 6, 5), 10, 0), LeadTime::OneHour));
        assert!(!is_eligible(now(), &shift_at((2024, 6, 5), 10, 1), LeadTime::OneHour));
    }

    #[test]
    fn test_longer_windows_span_days() {
        let tomorrow_morning = shift_at((2024, 6, 6), 8, 0);
        assert!(!is_eligible(now(), &tomorrow_morning, LeadTime::TwelveHours));
        assert!(is_eligible(now(), &tomorrow_morning, LeadTime::TwentyFourHours));
        assert!(is_eligible(now(), &shift_at((2024, 6, 5), 11, 30), LeadTime::ThreeHours));
    }

    #[test]
    fn test_describe_relative() {
        assert_eq!(describe_relative(Duration::minutes(55)), "in 55 minutes");
        assert_eq!(describe_relative(Duration::minutes(1)), "in 1 minute");
        assert_eq!(describe_relative(Duration::seconds(20)), "in 1 minute");
        assert_eq!(describe_relative(Duration::seconds(59 * 60 + 40)), "in 59 minutes");
        assert_eq!(describe_relative(Duration::seconds(90 * 60 + 50)), "in 1 hour and 30 minutes");
        assert_eq!(describe_relative(Duration::minutes(60)), "in 1 hour");
        assert_eq!(describe_relative(Duration::minutes(61)), "in 1 hour and 1 minute");
        assert_eq!(describe_relative(Duration::minutes(150)), "in 2 hours and 30 minutes");
        assert_eq!(describe_relative(Duration::hours(24)), "in 24 hours");
    }

    #[test]
    fn test_reminder_message() {
        let msg = reminder_message(now(), &shift_at((2024, 6, 5), 9, 55));
        assert_eq!(
            msg,
            "Reminder: you have a shift as Barista starting at 09:55 (in 55 minutes)"
        );
    }
}
