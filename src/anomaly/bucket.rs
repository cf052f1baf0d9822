// LogSift - GPL-3.0-or-later
// This file is part of LogSift.
//
// Copyright (C) 2026 Daniel Freiermuth
//
// LogSift is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// LogSift is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with LogSift.  If not, see <https://www.gnu.org/licenses/>.

//! Fixed-width time buckets.

use chrono::{DurationRound, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Start of a time bucket. Ordered by time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketKey(NaiveDateTime);

impl BucketKey {
    #[must_use]
    pub const fn start(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Width of a time bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Granularity(TimeDelta);

impl Granularity {
    #[must_use]
    pub const fn minute() -> Self {
        Self(TimeDelta::minutes(1))
    }

    /// Returns `None` for non-positive or out of range widths.
    #[must_use]
    pub fn from_secs(secs: i64) -> Option<Self> {
        if secs <= 0 {
            return None;
        }
        TimeDelta::try_seconds(secs).map(Self)
    }
}

impl Default for Granularity {
    fn default() -> Self {
        Self::minute()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BucketError {
    #[error("event has no usable timestamp")]
    InvalidTimestamp,
}

/// Floor `timestamp` to the start of its bucket.
///
/// Events without a timestamp can't be bucketed; callers are expected to
/// filter them out (or skip on the error) before aggregating.
pub fn bucket(
    timestamp: Option<NaiveDateTime>,
    granularity: Granularity,
) -> Result<BucketKey, BucketError> {
    let ts = timestamp.ok_or(BucketError::InvalidTimestamp)?;
    ts.duration_trunc(granularity.0)
        .map(BucketKey)
        .map_err(|_| BucketError::InvalidTimestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_milli_opt(h, m, s, ms)
            .unwrap()
    }

    #[test]
    fn test_floor_to_minute() {
        let key = bucket(Some(at(10, 15, 59, 999)), Granularity::minute()).unwrap();
        assert_eq!(key.start(), at(10, 15, 0, 0));
        assert_eq!(key.to_string(), "2025-03-01 10:15:00");
    }

    #[test]
    fn test_boundary_is_its_own_bucket() {
        let key = bucket(Some(at(10, 15, 0, 0)), Granularity::minute()).unwrap();
        assert_eq!(key.start(), at(10, 15, 0, 0));
    }

    #[test]
    fn test_custom_granularity() {
        let five_min = Granularity::from_secs(300).unwrap();
        let key = bucket(Some(at(10, 17, 30, 0)), five_min).unwrap();
        assert_eq!(key.start(), at(10, 15, 0, 0));
        assert!(Granularity::from_secs(0).is_none());
        assert!(Granularity::from_secs(-60).is_none());
    }

    #[test]
    fn test_missing_timestamp() {
        assert_eq!(
            bucket(None, Granularity::minute()),
            Err(BucketError::InvalidTimestamp)
        );
    }

    #[test]
    fn test_keys_order_by_time() {
        let g = Granularity::minute();
        let earlier = bucket(Some(at(9, 59, 59, 0)), g).unwrap();
        let later = bucket(Some(at(10, 0, 0, 0)), g).unwrap();
        assert!(earlier < later);
    }
}
