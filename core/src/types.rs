//! Shared primitive types used across the entire dataset.

use chrono::{NaiveDate, NaiveDateTime};

/// Investor primary key: 8 digits, leading 8 or 9.
pub type PhoneNumber = String;

/// `g001`, `g002`, ...
pub type GoalId = String;

/// `p001`, `p002`, ...
pub type PortfolioId = String;

/// `a001`, `a002`, ...
pub type AssetId = String;

/// `t001`, `t002`, ...
pub type TransactionId = String;

/// `brk001`, `brk002`, ...
pub type CompanyId = String;

/// Format a sequential identifier: `prefix` followed by `n` zero padded to 3.
pub fn sequential_id(prefix: &str, n: usize) -> String {
    format!("{prefix}{n:03}")
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Build a date from parts generated inside known-valid ranges.
/// Days are always drawn from 1..=28, so every month is valid.
pub(crate) fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| panic!("invalid generated date {year}-{month}-{day}"))
}

pub(crate) fn ymd_hms(year: i32, month: u32, day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    ymd(year, month, day)
        .and_hms_opt(h, m, s)
        .unwrap_or_else(|| panic!("invalid generated time {h}:{m}:{s}"))
}

/// `YYYY-MM-DD HH:MM:SS` (de)serialization for timestamps.
pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_are_zero_padded() {
        assert_eq!(sequential_id("g", 1), "g001");
        assert_eq!(sequential_id("brk", 15), "brk015");
        assert_eq!(sequential_id("t", 900), "t900");
        assert_eq!(sequential_id("t", 1234), "t1234");
    }

    #[test]
    fn rounding_matches_two_and_four_places() {
        assert_eq!(round_to(100_000.0 * 0.0088, 2), 880.0);
        assert_eq!(round_to(0.123_456, 4), 0.1235);
        assert_eq!(round_to(-4.996, 2), -5.0);
    }
}
