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

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One input line after field extraction.
///
/// Every field besides `raw` is optional: a line the extractor could not make
/// sense of still produces an `Event`, it just drops out of the metrics that
/// need the missing field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub raw: String,
    pub line_number: usize,
    pub timestamp: Option<NaiveDateTime>,
    pub level: LogLevel,
    pub service: Option<String>,
    pub user: Option<String>,
    pub error: Option<String>,
    /// Operation duration in milliseconds
    pub duration_ms: Option<f64>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Verbose,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
    #[default]
    Unknown,
}

impl LogLevel {
    #[must_use]
    pub fn from_name(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "VERBOSE" | "TRACE" | "V" => Self::Verbose,
            "DEBUG" | "D" => Self::Debug,
            "INFO" | "NOTICE" | "I" => Self::Info,
            "WARNING" | "WARN" | "W" => Self::Warning,
            "ERROR" | "ERR" | "E" => Self::Error,
            "FATAL" | "CRITICAL" | "CRIT" | "F" => Self::Fatal,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Verbose => 0,
            Self::Debug => 1,
            Self::Info => 2,
            Self::Warning => 3,
            Self::Error => 4,
            Self::Fatal => 5,
            Self::Unknown => 0,
        }
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        self.severity() >= Self::Error.severity()
    }
}

impl Event {
    #[must_use]
    pub const fn new(raw: String, line_number: usize) -> Self {
        Self {
            raw,
            line_number,
            timestamp: None,
            level: LogLevel::Unknown,
            service: None,
            user: None,
            error: None,
            duration_ms: None,
            message: String::new(),
        }
    }

    /// Whether this line reports a failure, either through an explicit error
    /// field or through its level.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some() || self.level.is_error()
    }

    /// Label used for error-frequency counting.
    ///
    /// The explicit error field wins; error-level lines without one fall back
    /// to their message text.
    #[must_use]
    pub fn error_label(&self) -> Option<&str> {
        self.error.as_deref().or_else(|| {
            (self.level.is_error() && !self.message.is_empty()).then_some(self.message.as_str())
        })
    }
}
