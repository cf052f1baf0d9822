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

pub mod extract;
pub mod line;
pub mod timestamp;

use fancy_regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

// Dates, times and date-times in the usual shapes, with optional brackets:
// 2025-11-20, 2025/11/20 14:23:45, [2025-11-20T14:23:45.123Z], 14:23:45,123, Nov 20 14:23:45
static TIMESTAMP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    const TIME: &str = r"\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:\s?(?:Z|UTC|[+-]\d{2}:?\d{2}))?";
    const DATE: &str = r"\d{4}[-/]\d{2}[-/]\d{2}";
    const MONTH: &str = r"(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)";
    Regex::new(&format!(
        r"\[?(?:{DATE}(?:[T\s]+{TIME})?|{MONTH}\s+\d{{1,2}}\s+{TIME}|{TIME})\]?"
    ))
    .expect("valid timestamp regex")
});

// request_id=abc123, "requestId": "abc", X-Correlation-ID: 42; trailing delimiter included
static REQUEST_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)"?\b(?:x-)?(?:request|req|correlation|trace)[_-]?id"?\s*[=:]\s*"?[^\s,;"]*"?\s*[,;]?"#,
    )
    .expect("valid request id regex")
});

static WHITESPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

fn normalize_pass(line: &str) -> String {
    let stripped = REQUEST_ID_PATTERN.replace_all(line, " ");
    let stripped = TIMESTAMP_PATTERN.replace_all(&stripped, " ");
    WHITESPACE_PATTERN
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// Strip the volatile parts of a log line to get a stable comparison key.
///
/// Timestamps and request-correlation fields are removed and whitespace is
/// collapsed. Removing one field can line up text that looks like another
/// timestamp, so passes repeat until nothing changes; every pass that changes
/// the text shortens it or only rewrites whitespace, which settles after one
/// pass. The result is therefore a fixed point: normalizing it again returns
/// it unchanged.
#[must_use]
pub fn normalize_line(raw: &str) -> String {
    let mut current = normalize_pass(raw);
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// SHA-256 of the normalized line, hex encoded.
#[must_use]
pub fn content_hash(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}
