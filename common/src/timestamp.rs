// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::ParseError;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// A wall-clock time of day with millisecond resolution.
///
/// The string form is `HH:MM:SS.mmm` with zero-padded fields and always
/// three fractional digits, and it round-trips through [`FromStr`] and
/// [`fmt::Display`].
///
/// Addition and subtraction wrap around midnight, so subtracting a later
/// time from an earlier one yields the remaining part of the day:
///
/// ```rust
/// use common::timestamp::Timestamp;
///
/// let t1: Timestamp = "03:00:00.000".parse().unwrap();
/// let t2: Timestamp = "05:00:00.000".parse().unwrap();
/// assert_eq!((t1 - t2).to_string(), "22:00:00.000");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

impl Timestamp {
    pub fn new(hour: u8, minute: u8, second: u8, millisecond: u16) -> Self {
        Timestamp {
            hour,
            minute,
            second,
            millisecond,
        }
    }

    /// The time of day expressed as milliseconds since midnight.
    pub fn total_milliseconds(&self) -> i64 {
        (self.hour as i64) * 3_600_000
            + (self.minute as i64) * 60_000
            + (self.second as i64) * 1_000
            + self.millisecond as i64
    }

    /// Builds a timestamp from milliseconds, wrapping into the 24 h range.
    /// Negative inputs land on the previous day, e.g. `-1` becomes
    /// `23:59:59.999`.
    pub fn from_total_milliseconds(millis: i64) -> Self {
        let millis = millis.rem_euclid(MILLIS_PER_DAY);
        Timestamp {
            hour: (millis / 3_600_000) as u8,
            minute: ((millis / 60_000) % 60) as u8,
            second: ((millis / 1_000) % 60) as u8,
            millisecond: (millis % 1_000) as u16,
        }
    }

    /// The current system time of day in UTC.
    pub fn system_time() -> Self {
        Timestamp::from(chrono::Utc::now().time())
    }

    /// Parses the `HH:MM:SS.mmm` form, substituting the default timestamp
    /// when the input is malformed. The rejected input is logged.
    pub fn parse_or_default(input: &str) -> Self {
        input.parse().unwrap_or_else(|e| {
            tracing::error!("{e}");
            Timestamp::default()
        })
    }
}

impl From<NaiveTime> for Timestamp {
    fn from(time: NaiveTime) -> Self {
        Timestamp {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            second: time.second() as u8,
            // nanosecond() may report leap seconds beyond 999ms
            millisecond: ((time.nanosecond() / 1_000_000) % 1_000) as u16,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hour, self.minute, self.second, self.millisecond
        )
    }
}

impl FromStr for Timestamp {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidTimestamp(input.to_owned());
        let (hms, millis) = input.split_once('.').ok_or_else(invalid)?;
        let mut parts = hms.split(':');
        let mut next = || -> Result<u8, ParseError> {
            parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(invalid)
        };
        let hour = next()?;
        let minute = next()?;
        let second = next()?;
        let millisecond: u16 = millis.parse().map_err(|_| invalid())?;
        if parts.next().is_some()
            || hour > 23
            || minute > 59
            || second > 59
            || millisecond > 999
        {
            return Err(invalid());
        }
        Ok(Timestamp {
            hour,
            minute,
            second,
            millisecond,
        })
    }
}

impl Add for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Timestamp) -> Timestamp {
        Timestamp::from_total_milliseconds(self.total_milliseconds() + rhs.total_milliseconds())
    }
}

impl Sub for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Timestamp) -> Timestamp {
        Timestamp::from_total_milliseconds(self.total_milliseconds() - rhs.total_milliseconds())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
