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

//! Timestamp recognition for the formats commonly found in server logs.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use fancy_regex::Regex;
use std::sync::LazyLock;

// log4j / stdlib logging default: 2025-11-20 14:23:45,123 at the very start of a line
static LOGGING_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d{3}").expect("valid logging prefix regex")
});

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%d/%b/%Y:%H:%M:%S",
];

/// Parse a standalone timestamp value, as found in a JSON or CSV field.
///
/// Zoned timestamps are converted to UTC; zone-less ones are taken as
/// written. Purely numeric values are read as Unix epoch seconds, or
/// milliseconds when they are too large to be seconds.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim().trim_matches(|c| c == '[' || c == ']');
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%z") {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%d/%b/%Y:%H:%M:%S %z") {
        return Some(dt.naive_utc());
    }

    // Logging frameworks often separate milliseconds with a comma
    let dotted = value.replacen(',', ".", 1);
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&dotted, format) {
            return Some(naive);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    if let Ok(epoch) = value.parse::<i64>() {
        let dt = if epoch.abs() >= 100_000_000_000 {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        };
        return dt.map(|dt| dt.naive_utc());
    }

    None
}

/// Count lines that start with a `YYYY-MM-DD HH:MM:SS,mmm` logging prefix.
///
/// Continuation lines of multi-line entries (stack traces) don't carry the
/// prefix, so this is the number of log records rather than text lines.
#[must_use]
pub fn count_timestamped_lines<'a, I>(lines: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .filter(|line| LOGGING_PREFIX.is_match(line).unwrap_or(false))
        .count()
}
