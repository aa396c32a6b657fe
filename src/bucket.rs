//! # Hour buckets
//! Turns a Twitter-style timestamp (`"Wed Oct 10 20:19:24 +0000 2018"`) into the
//! epoch-millisecond start of its hour, used as the partition prefix of every
//! outbound key.
//!
//! The embedded offset is checked for syntax but the wall-clock is interpreted
//! in the configured [`ProcessingZone`], not in that offset.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, TimeZone, Utc};

use crate::error::{ConfigError, ParseError};

/// Twitter `created_at` layout.
pub const TWITTER_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

const HOUR_MS: i64 = 3_600_000;

/// Zone in which source wall-clock times are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingZone {
    #[default]
    Utc,
    /// The host's system zone.
    Local,
    Fixed(FixedOffset),
}

impl ProcessingZone {
    /// Map a wall-clock reading onto an instant.
    ///
    /// DST folds resolve to the earlier instant; wall-clocks inside a DST gap
    /// are pushed forward by an hour.
    pub fn resolve(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            ProcessingZone::Utc => Some(Utc.from_utc_datetime(&naive)),
            ProcessingZone::Local => resolve_in(&chrono::Local, naive),
            ProcessingZone::Fixed(offset) => resolve_in(offset, naive),
        }
    }
}

fn resolve_in<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return Some(dt.with_timezone(&Utc));
    }
    let shifted = naive.checked_add_signed(TimeDelta::hours(1))?;
    tz.from_local_datetime(&shifted)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

impl FromStr for ProcessingZone {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t.eq_ignore_ascii_case("utc") || t.eq_ignore_ascii_case("z") {
            return Ok(ProcessingZone::Utc);
        }
        if t.eq_ignore_ascii_case("local") || t.eq_ignore_ascii_case("system") {
            return Ok(ProcessingZone::Local);
        }
        parse_offset(t)
            .map(ProcessingZone::Fixed)
            .ok_or_else(|| ConfigError::Zone(s.to_string()))
    }
}

impl fmt::Display for ProcessingZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingZone::Utc => f.write_str("UTC"),
            ProcessingZone::Local => f.write_str("local"),
            ProcessingZone::Fixed(o) => write!(f, "{o}"),
        }
    }
}

/// Accepts `+HH`, `+HHMM` and `+HH:MM` (and the `-` forms).
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let sign = match s.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let digits: String = s[1..].chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (h, m) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if h > 23 || m > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (h * 3600 + m * 60))
}

/// Field shapes of `Www Mmm dd HH:mm:ss +hhmm yyyy`, checked ahead of chrono,
/// whose parser accepts runs of whitespace, single-digit fields and `+hh:mm`.
fn has_twitter_layout(s: &str) -> bool {
    let fields: Vec<&str> = s.split(' ').collect();
    let [weekday, month, day, time, offset, year] = fields[..] else {
        return false;
    };
    let alpha3 = |f: &str| f.len() == 3 && f.bytes().all(|b| b.is_ascii_alphabetic());
    let digits = |f: &str, n: usize| f.len() == n && f.bytes().all(|b| b.is_ascii_digit());

    let time_ok = time.len() == 8
        && time.split(':').count() == 3
        && time.split(':').all(|part| digits(part, 2));
    let offset_ok = offset.len() == 5
        && matches!(offset.as_bytes()[0], b'+' | b'-')
        && digits(&offset[1..], 4);

    alpha3(weekday) && alpha3(month) && digits(day, 2) && time_ok && offset_ok && digits(year, 4)
}

/// Parse `timestamp` and return the epoch millis of the start of its hour.
pub fn derive_hour_bucket(timestamp: &str, zone: &ProcessingZone) -> Result<i64, ParseError> {
    if !has_twitter_layout(timestamp) {
        return Err(ParseError::Layout(timestamp.to_string()));
    }
    let naive = NaiveDateTime::parse_from_str(timestamp, TWITTER_FORMAT).map_err(|source| {
        ParseError::Format {
            input: timestamp.to_string(),
            source,
        }
    })?;
    let instant = zone
        .resolve(naive)
        .ok_or_else(|| ParseError::Unrepresentable(timestamp.to_string()))?;
    Ok(truncate_to_hour(instant.timestamp_millis()))
}

/// Floor epoch millis to the containing hour (also correct before 1970).
pub fn truncate_to_hour(millis: i64) -> i64 {
    millis.div_euclid(HOUR_MS) * HOUR_MS
}
