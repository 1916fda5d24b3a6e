// Time bucket arithmetic - granularity-aligned buckets relative to 1970-01-01 UTC
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds since 1970-01-01 UTC.
pub type Timestamp = i64;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Days between 0001-01-01 (day 1 of the common era) and 1970-01-01.
const EPOCH_DAYS_FROM_CE: i64 = 719_163;
const MONTH_ZERO: i64 = 1970 * 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Year,
    Month,
    Week,
    #[default]
    Day,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Year => "year",
            Granularity::Month => "month",
            Granularity::Week => "week",
            Granularity::Day => "day",
        }
    }

    /// Nominal bucket length in seconds. Only used to size chunks, never to
    /// compute bucket boundaries.
    pub fn nominal_seconds(&self) -> i64 {
        match self {
            Granularity::Year => SECONDS_PER_DAY * 365,
            Granularity::Month => SECONDS_PER_DAY * 30,
            Granularity::Week => SECONDS_PER_DAY * 7,
            Granularity::Day => SECONDS_PER_DAY,
        }
    }

    /// Width of one fetch chunk holding `chunk_length` nominal buckets.
    /// Saturates at `i64::MAX` for oversized chunk lengths.
    pub fn range_size(&self, chunk_length: i64) -> i64 {
        self.nominal_seconds().saturating_mul(chunk_length.max(1))
    }

    /// Index of the bucket containing `ts`.
    ///
    /// Days and weeks count from the epoch, months count from January 1970
    /// (which is month 1), years are calendar years.
    pub fn bucket_of(&self, ts: Timestamp) -> i64 {
        match self {
            Granularity::Day => ts.div_euclid(SECONDS_PER_DAY),
            Granularity::Week => ts.div_euclid(SECONDS_PER_DAY).div_euclid(7),
            Granularity::Month => self.bucket_of_date(date_of(ts)),
            Granularity::Year => date_of(ts).year() as i64,
        }
    }

    pub fn bucket_of_date(&self, date: NaiveDate) -> i64 {
        match self {
            Granularity::Day => days_since_epoch(date),
            Granularity::Week => days_since_epoch(date).div_euclid(7),
            Granularity::Month => date.year() as i64 * 12 + date.month() as i64 - MONTH_ZERO,
            Granularity::Year => date.year() as i64,
        }
    }

    /// Timestamp of the first second of bucket `index`. `None` when the
    /// bucket lies outside the representable calendar.
    pub fn bucket_start(&self, index: i64) -> Option<Timestamp> {
        match self {
            Granularity::Day => index.checked_mul(SECONDS_PER_DAY),
            Granularity::Week => index.checked_mul(SECONDS_PER_DAY * 7),
            Granularity::Month => {
                let k = index - 1;
                let year = i32::try_from(1970 + k.div_euclid(12)).ok()?;
                let month = (k.rem_euclid(12) + 1) as u32;
                NaiveDate::from_ymd_opt(year, month, 1).map(date_to_timestamp)
            }
            Granularity::Year => {
                let year = i32::try_from(index).ok()?;
                NaiveDate::from_ymd_opt(year, 1, 1).map(date_to_timestamp)
            }
        }
    }

    /// Position of `date` inside its year at this granularity: day of year
    /// (1..=366), week of year (1..=53), month (1..=12), or the year itself.
    pub fn cyclic_bucket_of(&self, date: NaiveDate) -> i64 {
        match self {
            Granularity::Day => date.ordinal() as i64,
            Granularity::Week => (date.ordinal() as i64 - 1) / 7 + 1,
            Granularity::Month => date.month() as i64,
            Granularity::Year => date.year() as i64,
        }
    }

    /// X domain of an aggregated "by time of year" plot. Years have no fixed
    /// cycle, so the caller falls back to the data extent.
    pub fn cyclic_domain(&self) -> Option<(f64, f64)> {
        match self {
            Granularity::Day => Some((1.0, 366.0)),
            Granularity::Week => Some((1.0, 53.0)),
            Granularity::Month => Some((1.0, 12.0)),
            Granularity::Year => None,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn days_since_epoch(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64 - EPOCH_DAYS_FROM_CE
}

pub fn date_to_timestamp(date: NaiveDate) -> Timestamp {
    days_since_epoch(date) * SECONDS_PER_DAY
}

/// Calendar date containing `ts`, saturating at the ends of the calendar.
pub fn date_of(ts: Timestamp) -> NaiveDate {
    let days = ts.div_euclid(SECONDS_PER_DAY) + EPOCH_DAYS_FROM_CE;
    i32::try_from(days)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Parse a `YYYY-MM-DD` string into the timestamp of its midnight.
pub fn parse_date(s: &str) -> Result<Timestamp, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map(date_to_timestamp)
}

pub fn format_timestamp(ts: Timestamp) -> String {
    date_of(ts).format("%Y-%m-%d").to_string()
}
