// models/src/schedule.rs
//! Calendar helpers for appointment dates and time-slot strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::{ValidationError, ValidationResult};

const TIME_SLOT_FORMATS: &[&str] = &["%I:%M %p", "%I:%M%p", "%H:%M", "%H:%M:%S"];

/// Parses an appointment date.
///
/// Accepts a plain calendar date (`2025-06-01`) or an RFC 3339 timestamp, in
/// which case only its date part is kept.
pub fn parse_appointment_date(value: &str) -> ValidationResult<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required("appointment date"));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .map_err(|_| ValidationError::InvalidDateFormat(value.to_string()))
}

/// Best-effort parse of a slot string such as `"10:00 AM"` or `"14:30"`.
///
/// Slots are stored verbatim; this is only used where a point in time is
/// needed (the hourly reminder window).
pub fn parse_time_slot(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    TIME_SLOT_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value, fmt).ok())
}

/// Start instant of an appointment, falling back to the start of its day
/// when the slot string is not a recognizable time.
pub fn slot_start(date: NaiveDate, time: &str) -> NaiveDateTime {
    date.and_time(parse_time_slot(time).unwrap_or(NaiveTime::MIN))
}

/// `June 1, 2025`
pub fn spoken_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// `Sunday, June 1, 2025`
pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}
