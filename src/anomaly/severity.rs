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

//! Line severity and critical-condition detection.
//!
//! Complements the classifier's own verdict: a line that names a well known
//! critical condition is critical no matter what the model answered.

use crate::classifier::Classification;
use crate::parser::line::LogLevel;
use fancy_regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// How bad a line reads, from its level and its wording
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    None,
    Notice,
    Warning,
    Failure,
    Error,
}

// Most severe class first; the first match decides
const KEYWORD_CLASSES: &[(Severity, &str)] = &[
    (
        Severity::Error,
        r"(?i)\b(error|exception|fatal|panic|segfault|traceback|oom|core dumped)\b",
    ),
    (
        Severity::Failure,
        r"(?i)\b(fail(s|ed|ure)?|refused|denied|rejected|unreachable|aborted|time[ds]? ?out)\b",
    ),
    (
        Severity::Warning,
        r"(?i)\b(warn(ing)?|deprecated|retry(ing)?|degraded|throttled|slow)\b",
    ),
    (
        Severity::Notice,
        r"(?i)\b(invalid|unexpected|unable|cannot|missing|not found)\b",
    ),
];

static KEYWORDS: LazyLock<Vec<(Severity, Regex)>> = LazyLock::new(|| {
    KEYWORD_CLASSES
        .iter()
        .map(|(severity, pattern)| (*severity, Regex::new(pattern).expect("valid severity regex")))
        .collect()
});

impl Severity {
    /// Most severe keyword class named in `text`
    #[must_use]
    pub fn from_keywords(text: &str) -> Self {
        KEYWORDS
            .iter()
            .find(|(_, re)| re.is_match(text).unwrap_or(false))
            .map_or(Self::None, |(severity, _)| *severity)
    }

    #[must_use]
    pub const fn from_level(level: LogLevel) -> Self {
        match level {
            LogLevel::Error | LogLevel::Fatal => Self::Error,
            LogLevel::Warning => Self::Warning,
            LogLevel::Verbose | LogLevel::Debug | LogLevel::Info | LogLevel::Unknown => Self::None,
        }
    }

    /// The worse of what the level and the wording say
    #[must_use]
    pub fn of_line(raw: &str, level: LogLevel) -> Self {
        Self::from_level(level).max(Self::from_keywords(raw))
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Failure => "failure",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phrases that make a line critical on their own
pub const CRITICAL_PHRASES: &[&str] = &[
    // Authentication
    "failed login",
    "login failure",
    "multiple failed login",
    "unauthorized access",
    "invalid credentials",
    "authentication failure",
    // Network and security
    "port scan",
    "ddos attack",
    "firewall breach",
    "suspicious activity",
    "intrusion detected",
    // Disk and hardware
    "disk space low",
    "disk warning",
    "raid array degraded",
    "hardware failure",
    // Database
    "connection timeout",
    "database timeout",
    "deadlock detected",
    "sql exception",
    // Application
    "unhandled exception",
    "service unavailable",
    "crash report",
    "error while executing",
    // System
    "out of memory",
    "kernel panic",
    "resource exhausted",
    "reboot required",
];

/// The critical phrase contained in `line`, if any.
#[must_use]
pub fn critical_phrase(line: &str) -> Option<&'static str> {
    let line = line.to_lowercase();
    CRITICAL_PHRASES
        .iter()
        .copied()
        .find(|phrase| line.contains(phrase))
}

/// Whether a classified line is critical: the model said so, or the raw line
/// names a critical condition.
#[must_use]
pub fn is_critical(classification: &Classification, raw_line: &str) -> bool {
    classification.is_critical || critical_phrase(raw_line).is_some()
}
