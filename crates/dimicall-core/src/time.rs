use chrono::{
    DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

const INSTANT_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Largest spreadsheet serial chrono-compatible tools agree on (9999-12-31).
const MAX_SERIAL_DAY: f64 = 2_958_465.0;

static DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})$").expect("valid day-first pattern")
});

static YEAR_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})[/\-](\d{1,2})[/\-](\d{1,2})$").expect("valid year-first pattern")
});

static CLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})\s*(?::|h|H)\s*(\d{2})?(?::(\d{2}))?$").expect("valid clock pattern")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("value cannot be empty")]
    Empty,
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("invalid time: {0}")]
    InvalidTime(String),
    #[error("invalid timestamp: expected RFC 3339 or YYYY-MM-DD HH:MM[:SS], got {0}")]
    InvalidTimestamp(String),
    #[error("ambiguous local time: {0}")]
    AmbiguousLocalTime(String),
}

pub fn now_utc() -> i64 {
    Utc::now().timestamp()
}

/// Parses a calendar date written the French way (day first) or in ISO order.
/// A trailing time part (`2024-03-01T10:00`, `01/03/2024 10:00`) is ignored.
pub fn parse_date(input: &str) -> Result<NaiveDate, TimeParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TimeParseError::Empty);
    }
    let date_part = trimmed
        .split(|ch: char| ch == 'T' || ch.is_whitespace())
        .next()
        .unwrap_or(trimmed);

    if let Some(caps) = YEAR_FIRST.captures(date_part) {
        return ymd(&caps[1], &caps[2], &caps[3], input);
    }
    if let Some(caps) = DAY_FIRST.captures(date_part) {
        let year = &caps[3];
        if year.len() == 2 {
            let short: i32 = year.parse().map_err(|_| invalid_date(input))?;
            let full = if short < 70 { 2000 + short } else { 1900 + short };
            return ymd(&full.to_string(), &caps[2], &caps[1], input);
        }
        return ymd(year, &caps[2], &caps[1], input);
    }
    if let Ok(serial) = date_part.replace(',', ".").parse::<f64>() {
        return date_from_serial(serial);
    }
    Err(invalid_date(input))
}

/// Converts a spreadsheet serial day number (1900 date system) to a date.
pub fn date_from_serial(serial: f64) -> Result<NaiveDate, TimeParseError> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_SERIAL_DAY {
        return Err(TimeParseError::InvalidDate(serial.to_string()));
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)
        .ok_or_else(|| TimeParseError::InvalidDate(serial.to_string()))?;
    base.checked_add_signed(Duration::days(serial.floor() as i64))
        .ok_or_else(|| TimeParseError::InvalidDate(serial.to_string()))
}

/// Parses `HH:MM`, `HH:MM:SS`, `14h30` or `14h`.
pub fn parse_time(input: &str) -> Result<NaiveTime, TimeParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TimeParseError::Empty);
    }
    let caps = CLOCK
        .captures(trimmed)
        .ok_or_else(|| TimeParseError::InvalidTime(input.to_string()))?;
    let part = |idx: usize| -> Result<u32, TimeParseError> {
        caps.get(idx)
            .map_or(Ok(0), |m| m.as_str().parse::<u32>())
            .map_err(|_| TimeParseError::InvalidTime(input.to_string()))
    };
    if caps.get(2).is_none() && !trimmed.to_ascii_lowercase().ends_with('h') {
        return Err(TimeParseError::InvalidTime(input.to_string()));
    }
    NaiveTime::from_hms_opt(part(1)?, part(2)?, part(3)?)
        .ok_or_else(|| TimeParseError::InvalidTime(input.to_string()))
}

/// Converts a spreadsheet time (fraction of a day) to a time of day.
pub fn time_from_day_fraction(fraction: f64) -> Result<NaiveTime, TimeParseError> {
    if !fraction.is_finite() || !(0.0..1.0).contains(&fraction) {
        return Err(TimeParseError::InvalidTime(fraction.to_string()));
    }
    let seconds = (fraction * 86_400.0).round() as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds.min(86_399), 0)
        .ok_or_else(|| TimeParseError::InvalidTime(fraction.to_string()))
}

/// Parses an instant given either as RFC 3339 or as a local date-time.
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TimeParseError::Empty);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in INSTANT_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return local_to_utc(naive);
        }
    }
    Err(TimeParseError::InvalidTimestamp(input.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Elapsed time of one call, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDuration {
    pub seconds: u64,
    /// Set when the end preceded the start and the duration was forced to zero.
    pub clamped: bool,
}

impl CallDuration {
    pub fn from_seconds(seconds: u64) -> Self {
        Self {
            seconds,
            clamped: false,
        }
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let elapsed = end.signed_duration_since(start).num_seconds();
        if elapsed < 0 {
            tracing::warn!(%start, %end, "call ended before it started; duration set to zero");
            return Self {
                seconds: 0,
                clamped: true,
            };
        }
        Self::from_seconds(elapsed as u64)
    }
}

impl fmt::Display for CallDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.seconds / 3600;
        let minutes = (self.seconds % 3600) / 60;
        let seconds = self.seconds % 60;
        if hours > 0 {
            write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
        } else {
            write!(f, "{minutes:02}:{seconds:02}")
        }
    }
}

fn ymd(year: &str, month: &str, day: &str, input: &str) -> Result<NaiveDate, TimeParseError> {
    let year: i32 = year.parse().map_err(|_| invalid_date(input))?;
    let month: u32 = month.parse().map_err(|_| invalid_date(input))?;
    let day: u32 = day.parse().map_err(|_| invalid_date(input))?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid_date(input))
}

fn invalid_date(input: &str) -> TimeParseError {
    TimeParseError::InvalidDate(input.to_string())
}

fn local_to_utc(naive: NaiveDateTime) -> Result<DateTime<Utc>, TimeParseError> {
    let local = Local
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| TimeParseError::AmbiguousLocalTime(naive.to_string()))?;
    Ok(local.with_timezone(&Utc))
}
