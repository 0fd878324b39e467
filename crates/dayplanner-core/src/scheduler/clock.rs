//! Naive local time-of-day arithmetic.
//!
//! All scheduling happens in minutes from midnight. Strings coming from
//! users and imports ("HH:MM", date-times, bare dates) are parsed here and
//! unparseable input comes back as `None` for the caller to default.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Minutes in a day; the exclusive upper bound of every window.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

const PLANNER_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Parse an "H:MM" or "HH:MM" clock string into minutes from midnight.
///
/// Hours are clamped to 0-23 and minutes to 0-59, so "27:75" reads as 23:59.
pub fn parse_time_to_minutes(value: &str) -> Option<u32> {
    let (hours, minutes) = value.trim().split_once(':')?;
    if hours.is_empty()
        || hours.len() > 2
        || minutes.len() != 2
        || !hours.bytes().all(|b| b.is_ascii_digit())
        || !minutes.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    Some(hours.min(23) * 60 + minutes.min(59))
}

/// Format minutes from midnight as "HH:MM". `1440` renders as "24:00".
pub fn format_hhmm(minutes: u32) -> String {
    let minutes = minutes.min(MINUTES_PER_DAY);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Format minutes from midnight on a 12-hour clock, e.g. "9:05 AM".
pub fn format_12h(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    let (h, m) = (minutes / 60, minutes % 60);
    let period = if h >= 12 { "PM" } else { "AM" };
    let hh = match h % 12 {
        0 => 12,
        other => other,
    };
    format!("{hh}:{m:02} {period}")
}

/// Parse a deadline or planner date.
///
/// Accepts RFC 3339 (kept at its written wall-clock time), `YYYY-MM-DDTHH:MM[:SS]`,
/// the same with a space separator, and a bare `YYYY-MM-DD` (midnight).
pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// Time-of-day written into a date-time string, in minutes from midnight.
///
/// Reads the `HH:MM` that follows a `T` or space separator at position 10,
/// without any timezone conversion.
pub fn clock_time_in(value: &str) -> Option<u32> {
    let separator = *value.as_bytes().get(10)?;
    if separator != b'T' && separator != b' ' {
        return None;
    }
    parse_time_to_minutes(value.get(11..16)?)
}

/// Minutes from midnight of a wall-clock time.
pub fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// The date-time `minutes` after midnight of `date`.
pub fn at_minutes(date: NaiveDate, minutes: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::minutes(i64::from(minutes))
}

/// Format a date-time the way planner dates are stored.
pub fn format_planner_date(at: NaiveDateTime) -> String {
    at.format(PLANNER_DATE_FORMAT).to_string()
}

/// Round up to the next quarter hour, wrapping at midnight.
pub fn next_quarter_hour(now: NaiveTime) -> u32 {
    let minutes = minutes_of(now);
    let rounded = minutes.div_ceil(15) * 15;
    rounded % MINUTES_PER_DAY
}

/// The `[start, end)` minute range a day's schedule may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    start: u32,
    end: u32,
}

impl DayWindow {
    /// Build a window, correcting `end <= start` to end of day.
    pub fn new(start: u32, end: u32) -> Self {
        let start = start.min(MINUTES_PER_DAY - 1);
        let mut end = end.min(MINUTES_PER_DAY);
        if end <= start {
            end = MINUTES_PER_DAY;
        }
        Self { start, end }
    }

    /// Build from "HH:MM" strings; unparseable bounds fall back to the
    /// whole day.
    pub fn from_clock_strings(day_start: &str, day_end: &str) -> Self {
        Self::new(
            parse_time_to_minutes(day_start).unwrap_or(0),
            parse_time_to_minutes(day_end).unwrap_or(MINUTES_PER_DAY),
        )
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn len_minutes(&self) -> u32 {
        self.end - self.start
    }

    pub fn contains(&self, minute: u32) -> bool {
        self.start <= minute && minute < self.end
    }

    /// Clamp a minute into `[start, end]`.
    pub fn clamp(&self, minute: u32) -> u32 {
        minute.clamp(self.start, self.end)
    }
}

impl Default for DayWindow {
    fn default() -> Self {
        Self::new(7 * 60, 22 * 60)
    }
}
