// src/time.rs

//! `HH:MM` time-of-day arithmetic and `YYYY-MM-DD` date parsing.
//!
//! Times are plain strings on purpose: the agenda exchanges them with the
//! backend and the dashboard in that form, and `add_minutes` is allowed to
//! produce hours past 23 (see below), which no time-of-day type can hold.

use chrono::NaiveDate;
use thiserror::Error;

pub const TIME_PATTERN: &str = "HH:MM";
pub const DATE_PATTERN: &str = "YYYY-MM-DD";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value {value:?}: expected {expected}")]
pub struct FormatError {
    pub value: String,
    pub expected: &'static str,
}

impl FormatError {
    fn time(value: &str) -> Self {
        FormatError {
            value: value.to_string(),
            expected: TIME_PATTERN,
        }
    }

    fn date(value: &str) -> Self {
        FormatError {
            value: value.to_string(),
            expected: DATE_PATTERN,
        }
    }
}

/// Splits an exact `\d{2}:\d{2}` string into its hour and minute fields.
/// No range check: "25:00" is accepted here.
fn split_hhmm(time: &str) -> Option<(u32, u32)> {
    let b = time.as_bytes();
    if b.len() != 5 || b[2] != b':' {
        return None;
    }
    let digits = [b[0], b[1], b[3], b[4]];
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let d = |i: usize| u32::from(digits[i] - b'0');
    Some((d(0) * 10 + d(1), d(2) * 10 + d(3)))
}

/// Minutes since midnight for an `HH:MM` string.
pub fn to_minutes(time: &str) -> Result<u32, FormatError> {
    let (h, m) = split_hhmm(time).ok_or_else(|| FormatError::time(time))?;
    Ok(h * 60 + m)
}

/// Adds `minutes` to an `HH:MM` time.
///
/// The hour is the integer quotient of the total minutes and is NOT wrapped
/// at 24: `add_minutes("23:30", 90)` is `"25:00"`. Negative totals use floor
/// division with a non-negative minute field.
pub fn add_minutes(time: &str, minutes: i64) -> Result<String, FormatError> {
    let start = i64::from(to_minutes(time)?);
    let total = start + minutes;
    Ok(format!(
        "{:02}:{:02}",
        total.div_euclid(60),
        total.rem_euclid(60)
    ))
}

/// `HH:MM` with hour < 24 and minute < 60.
pub fn is_valid_time(time: &str) -> bool {
    matches!(split_hhmm(time), Some((h, m)) if h < 24 && m < 60)
}

/// Parses a strict, zero-padded `YYYY-MM-DD` date.
pub fn parse_date(date: &str) -> Result<NaiveDate, FormatError> {
    // chrono accepts unpadded fields, the agenda contract does not
    if date.len() != 10 {
        return Err(FormatError::date(date));
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| FormatError::date(date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_minutes_parses_padded_times() {
        assert_eq!(to_minutes("00:00"), Ok(0));
        assert_eq!(to_minutes("09:30"), Ok(570));
        assert_eq!(to_minutes("23:59"), Ok(1439));
    }

    #[test]
    fn to_minutes_rejects_bad_shapes() {
        for bad in ["9:30", "09:3", "0930", "09-30", "ab:cd", "", "09:30:00"] {
            let err = to_minutes(bad).unwrap_err();
            assert_eq!(err.value, bad);
            assert_eq!(err.expected, TIME_PATTERN);
        }
    }

    #[test]
    fn add_minutes_within_the_day() {
        assert_eq!(add_minutes("09:00", 60).unwrap(), "10:00");
        assert_eq!(add_minutes("09:45", 30).unwrap(), "10:15");
        assert_eq!(add_minutes("10:00", 0).unwrap(), "10:00");
    }

    #[test]
    fn add_minutes_keeps_hours_past_midnight() {
        assert_eq!(add_minutes("23:30", 90).unwrap(), "25:00");
        assert_eq!(add_minutes("22:00", 1500).unwrap(), "47:00");
    }

    #[test]
    fn add_minutes_propagates_format_error() {
        assert!(add_minutes("7:00", 30).is_err());
    }

    #[test]
    fn valid_time_checks_ranges() {
        assert!(is_valid_time("23:59"));
        assert!(!is_valid_time("24:00"));
        assert!(!is_valid_time("12:60"));
        assert!(!is_valid_time("1:00"));
    }

    #[test]
    fn parse_date_is_strict() {
        assert_eq!(
            parse_date("2024-11-20").unwrap(),
            NaiveDate::from_ymd_opt(2024, 11, 20).unwrap()
        );
        assert!(parse_date("2024-1-20").is_err());
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("20/11/2024").is_err());
    }
}
