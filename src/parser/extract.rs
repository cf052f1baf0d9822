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

//! Pluggable field extraction.
//!
//! A [`FieldExtractor`] turns one raw line into a flat field mapping. Which
//! mapping keys become which [`Event`] attributes is decided by the
//! [`FormatConfig`] field names, so the same extractor serves any log layout.

use super::line::{Event, LogLevel};
use super::timestamp::parse_timestamp;
use crate::config::FormatConfig;
use fancy_regex::Regex;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Flat field mapping produced by an extractor, in source order.
pub type Fields = IndexMap<String, String>;

/// Layout of the raw lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Delimiter separated values
    Csv,
    /// Named-capture regex, with `key=value` pairs picked up from the message
    #[default]
    Custom,
}

/// Default pattern for `custom`: `<timestamp> [LEVEL] [service] message`
pub const DEFAULT_PATTERN: &str = r"^\[?(?P<timestamp>\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?)\]?\s+(?:\[?(?P<level>TRACE|VERBOSE|DEBUG|INFO|NOTICE|WARN(?:ING)?|ERROR|FATAL|CRITICAL)\]?:?\s+)?(?:\[(?P<service>[^\]]+)\]:?\s*)?(?P<message>.*)$";

static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b([A-Za-z_][\w.-]*)=("([^"]*)"|[^\s,;]+)"#).expect("valid key=value regex")
});

static LOG_LEVEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(TRACE|VERBOSE|DEBUG|INFO|NOTICE|WARN(?:ING)?|ERROR|ERR|FATAL|CRITICAL)\b")
        .expect("valid log level regex")
});

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("invalid custom log pattern: {0}")]
    Pattern(#[from] Box<fancy_regex::Error>),
    #[error("delimiter must not be empty")]
    EmptyDelimiter,
}

pub enum FieldExtractor {
    Json,
    Csv {
        delimiter: String,
        columns: Vec<String>,
    },
    Custom {
        pattern: Regex,
    },
}

impl FieldExtractor {
    pub fn from_config(config: &FormatConfig) -> Result<Self, ExtractError> {
        match config.log_format {
            LogFormat::Json => Ok(Self::Json),
            LogFormat::Csv => {
                if config.delimiter.is_empty() {
                    return Err(ExtractError::EmptyDelimiter);
                }
                Ok(Self::Csv {
                    delimiter: config.delimiter.clone(),
                    columns: config.columns.clone(),
                })
            }
            LogFormat::Custom => {
                let source = config.pattern.as_deref().unwrap_or(DEFAULT_PATTERN);
                let pattern = Regex::new(source).map_err(Box::new)?;
                Ok(Self::Custom { pattern })
            }
        }
    }

    /// Extract the field mapping of one line.
    ///
    /// Returns an empty mapping when the line doesn't fit the format.
    #[must_use]
    pub fn extract(&self, raw: &str) -> Fields {
        match self {
            Self::Json => extract_json(raw),
            Self::Csv { delimiter, columns } => extract_csv(raw, delimiter, columns),
            Self::Custom { pattern } => extract_custom(raw, pattern),
        }
    }

    /// Use `header` as column names when none were configured.
    ///
    /// Returns true if the header was consumed.
    pub fn adopt_header(&mut self, header: &str) -> bool {
        match self {
            Self::Csv { delimiter, columns } if columns.is_empty() => {
                *columns = split_record(header, delimiter);
                true
            }
            Self::Csv { .. } | Self::Json | Self::Custom { .. } => false,
        }
    }
}

fn extract_json(raw: &str) -> Fields {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(raw) else {
        return Fields::new();
    };

    map.into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                serde_json::Value::Null => return None,
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            Some((key, value))
        })
        .collect()
}

fn extract_csv(raw: &str, delimiter: &str, columns: &[String]) -> Fields {
    split_record(raw, delimiter)
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            let key = columns
                .get(idx)
                .cloned()
                .unwrap_or_else(|| idx.to_string());
            (key, value)
        })
        .collect()
}

/// Split one delimited record into field values, trimming unquoted ones.
///
/// A field wrapped in double quotes may contain the delimiter, and `""`
/// inside it stands for a literal quote. An unterminated quote runs to the
/// end of the line.
#[must_use]
pub fn split_record(raw: &str, delimiter: &str) -> Vec<String> {
    if delimiter.is_empty() {
        return vec![raw.trim().to_string()];
    }

    let mut values = Vec::new();
    let mut rest = raw;
    loop {
        let quoted = rest.trim_start_matches(' ').strip_prefix('"');
        let (value, remainder) = if let Some(quoted) = quoted {
            let (value, after) = unquote(quoted);
            // Anything between the closing quote and the delimiter is dropped
            let remainder = after.find(delimiter).map(|at| &after[at..]);
            (value, remainder)
        } else {
            match rest.find(delimiter) {
                Some(at) => (rest[..at].trim().to_string(), Some(&rest[at..])),
                None => (rest.trim().to_string(), None),
            }
        };
        values.push(value);

        match remainder {
            Some(remainder) => rest = &remainder[delimiter.len()..],
            None => return values,
        }
    }
}

/// Read a quoted value up to its closing quote, returning it and the text
/// after the quote.
fn unquote(quoted: &str) -> (String, &str) {
    let mut value = String::new();
    let mut chars = quoted.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if c != '"' {
            value.push(c);
            continue;
        }
        if chars.next_if(|(_, next)| *next == '"').is_some() {
            value.push('"');
            continue;
        }
        return (value, &quoted[idx + 1..]);
    }
    (value, "")
}

fn extract_custom(raw: &str, pattern: &Regex) -> Fields {
    let Ok(Some(caps)) = pattern.captures(raw) else {
        return Fields::new();
    };

    let mut fields = Fields::new();
    for name in pattern.capture_names().flatten() {
        if let Some(m) = caps.name(name) {
            fields.insert(name.to_string(), m.as_str().to_string());
        }
    }

    let message = fields.get("message").cloned().unwrap_or_default();
    for kv in KEY_VALUE.captures_iter(&message).flatten() {
        let (Some(key), Some(value)) = (kv.get(1), kv.get(2)) else {
            continue;
        };
        let value = kv.get(3).map_or(value.as_str(), |quoted| quoted.as_str());
        fields
            .entry(key.as_str().to_string())
            .or_insert_with(|| value.to_string());
    }

    fields
}

fn field<'a>(fields: &'a Fields, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Parse a duration such as `120ms`, `1.5s` or `250` into milliseconds.
///
/// Bare numbers are taken to be milliseconds already.
#[must_use]
pub fn parse_duration_ms(value: &str) -> Option<f64> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f64 = number.parse().ok()?;

    let factor = match unit.trim().to_lowercase().as_str() {
        "" | "ms" => 1.0,
        "ns" => 1e-6,
        "us" | "µs" => 1e-3,
        "s" | "sec" | "secs" => 1_000.0,
        "min" | "m" => 60_000.0,
        _ => return None,
    };

    let ms = number * factor;
    ms.is_finite().then_some(ms)
}

/// Find a level keyword anywhere in the raw line.
#[must_use]
pub fn detect_level(raw: &str) -> LogLevel {
    match LOG_LEVEL.captures(raw) {
        Ok(Some(caps)) => caps
            .get(1)
            .map_or(LogLevel::Unknown, |m| LogLevel::from_name(m.as_str())),
        _ => LogLevel::Unknown,
    }
}

/// Map an extracted field set onto an [`Event`] using the configured names.
#[must_use]
pub fn build_event(raw: &str, line_number: usize, fields: &Fields, config: &FormatConfig) -> Event {
    let mut event = Event::new(raw.to_string(), line_number);

    event.timestamp = field(fields, &config.timestamp_field).and_then(parse_timestamp);
    event.service = field(fields, &config.service_field).map(str::to_string);
    event.user = field(fields, &config.user_field).map(str::to_string);
    event.error = field(fields, &config.error_field).map(str::to_string);
    event.duration_ms = field(fields, &config.duration_field).and_then(parse_duration_ms);

    event.level = field(fields, "level")
        .map(LogLevel::from_name)
        .filter(|level| *level != LogLevel::Unknown)
        .unwrap_or_else(|| detect_level(raw));

    event.message = field(fields, "message")
        .or_else(|| field(fields, "msg"))
        .unwrap_or(raw)
        .to_string();

    event
}

/// Extract events from a batch of lines.
///
/// For CSV input without configured columns the first line is the header.
/// Line numbers are 1-based positions in `lines`.
pub fn extract_events(lines: &[String], config: &FormatConfig) -> Result<Vec<Event>, ExtractError> {
    let mut extractor = FieldExtractor::from_config(config)?;

    let mut skip = 0;
    if let Some(first) = lines.first() {
        if extractor.adopt_header(first) {
            skip = 1;
        }
    }

    let events: Vec<Event> = lines
        .iter()
        .enumerate()
        .skip(skip)
        .map(|(idx, raw)| {
            let fields = extractor.extract(raw);
            if fields.is_empty() {
                tracing::trace!(
                    "Line {} did not match the {:?} format",
                    idx + 1,
                    config.log_format
                );
            }
            build_event(raw, idx + 1, &fields, config)
        })
        .collect();

    let with_ts = events.iter().filter(|e| e.timestamp.is_some()).count();
    tracing::debug!(
        "Extracted {} events, {with_ts} with a usable timestamp",
        events.len()
    );

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn config(format: LogFormat) -> FormatConfig {
        FormatConfig {
            log_format: format,
            ..FormatConfig::default()
        }
    }

    #[test]
    fn test_custom_default_pattern() {
        let cfg = config(LogFormat::Custom);
        let extractor = FieldExtractor::from_config(&cfg).unwrap();
        let raw = "2025-03-01 10:15:32,123 ERROR [payments] Charge failed user=bob duration=120ms error=\"card declined\"";
        let fields = extractor.extract(raw);

        assert_eq!(fields.get("level").map(String::as_str), Some("ERROR"));
        assert_eq!(fields.get("service").map(String::as_str), Some("payments"));

        let event = build_event(raw, 7, &fields, &cfg);
        assert_eq!(event.line_number, 7);
        assert_eq!(event.timestamp.unwrap().minute(), 15);
        assert_eq!(event.level, LogLevel::Error);
        assert_eq!(event.user.as_deref(), Some("bob"));
        assert_eq!(event.error.as_deref(), Some("card declined"));
        assert_eq!(event.duration_ms, Some(120.0));
    }

    #[test]
    fn test_custom_mismatch_yields_empty_fields() {
        let extractor = FieldExtractor::from_config(&config(LogFormat::Custom)).unwrap();
        assert!(extractor.extract("no timestamp at all").is_empty());
    }

    #[test]
    fn test_json_fields() {
        let cfg = config(LogFormat::Json);
        let extractor = FieldExtractor::from_config(&cfg).unwrap();
        let raw = r#"{"timestamp":"2025-03-01T10:15:32Z","service":"api","duration":42.5,"level":"warn","extra":null}"#;
        let fields = extractor.extract(raw);
        assert_eq!(fields.get("duration").map(String::as_str), Some("42.5"));
        assert!(!fields.contains_key("extra"));

        let event = build_event(raw, 1, &fields, &cfg);
        assert_eq!(event.service.as_deref(), Some("api"));
        assert_eq!(event.level, LogLevel::Warning);
        assert_eq!(event.duration_ms, Some(42.5));

        assert!(extractor.extract("not json").is_empty());
        assert!(extractor.extract("[1,2,3]").is_empty());
    }

    #[test]
    fn test_csv_header_is_adopted() {
        let cfg = FormatConfig {
            log_format: LogFormat::Csv,
            delimiter: ";".to_string(),
            ..FormatConfig::default()
        };
        let lines = vec![
            "timestamp;service;duration".to_string(),
            "2025-03-01 10:15:32;auth;1.5s".to_string(),
            "garbage".to_string(),
        ];
        let events = extract_events(&lines, &cfg).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].line_number, 2);
        assert_eq!(events[0].service.as_deref(), Some("auth"));
        assert_eq!(events[0].duration_ms, Some(1500.0));
        assert!(events[1].timestamp.is_none());
    }

    #[test]
    fn test_csv_quoted_delimiter_keeps_columns_aligned() {
        let cfg = FormatConfig {
            log_format: LogFormat::Csv,
            ..FormatConfig::default()
        };
        let lines = vec![
            "timestamp,error,service,duration".to_string(),
            r#"2025-03-01 10:15:32,"disk full, retrying",storage,120ms"#.to_string(),
        ];
        let events = extract_events(&lines, &cfg).unwrap();
        assert_eq!(events[0].error.as_deref(), Some("disk full, retrying"));
        assert_eq!(events[0].service.as_deref(), Some("storage"));
        assert_eq!(events[0].duration_ms, Some(120.0));
    }

    #[test]
    fn test_split_record_quoting() {
        assert_eq!(
            split_record(r#"a, "say ""hi""" ,b"#, ","),
            vec!["a", r#"say "hi""#, "b"]
        );
        assert_eq!(split_record("a\t\tb", "\t"), vec!["a", "", "b"]);
        assert_eq!(
            split_record(r#"x;"unterminated; tail"#, ";"),
            vec!["x", "unterminated; tail"]
        );
        assert_eq!(split_record("a,", ","), vec!["a", ""]);
    }

    #[test]
    fn test_invalid_custom_pattern() {
        let cfg = FormatConfig {
            pattern: Some("(unclosed".to_string()),
            ..FormatConfig::default()
        };
        assert!(FieldExtractor::from_config(&cfg).is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_ms("250"), Some(250.0));
        assert_eq!(parse_duration_ms("2s"), Some(2000.0));
        assert_eq!(parse_duration_ms("500us"), Some(0.5));
        assert_eq!(parse_duration_ms("fast"), None);
        assert_eq!(parse_duration_ms("12 parsecs"), None);
    }

    #[test]
    fn test_detect_level() {
        assert_eq!(detect_level("something ERROR happened"), LogLevel::Error);
        assert_eq!(detect_level("all quiet"), LogLevel::Unknown);
    }
}
