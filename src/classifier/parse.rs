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

//! Classifier output parsing with a best-effort recovery stage.
//!
//! Models are asked for exactly one JSON object but regularly wrap it in
//! prose or emit several. Parsing runs in two stages: the whole text as one
//! object, then the first balanced `{...}` span found in the text.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Structured classification of one log line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default, deserialize_with = "lenient_string")]
    pub event_type: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub has_error: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub user_action_successful: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_critical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    /// Keys the model added on its own, kept so cached entries round-trip
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

// Models answer `"true"`, `1` or `null` about as often as a real boolean
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

impl Classification {
    #[must_use]
    pub fn event_type_or_unknown(&self) -> &str {
        let event_type = self.event_type.trim();
        if event_type.is_empty() {
            "Unknown"
        } else {
            event_type
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("no JSON object could be recovered from classifier output: {reason}")]
pub struct ClassificationParseError {
    pub reason: String,
}

/// Parse classifier output into a [`Classification`].
///
/// Output that isn't a single JSON object is searched for embedded objects,
/// in order of their opening brace; the first one that deserializes wins.
pub fn parse_classification(output: &str) -> Result<Classification, ClassificationParseError> {
    let primary = match serde_json::from_str::<Classification>(output.trim()) {
        Ok(parsed) => return Ok(parsed),
        Err(e) => e,
    };
    tracing::debug!("Classifier output is not a single JSON object ({primary}), trying recovery");

    let mut last_error = None;
    for span in balanced_objects(output) {
        match serde_json::from_str::<Classification>(span) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => last_error = Some(e),
        }
    }

    let reason = match last_error {
        Some(e) => format!("{primary}; no recovered span is a valid object, last: {e}"),
        None => format!("{primary}; no balanced object found"),
    };
    Err(ClassificationParseError { reason })
}

/// Every balanced `{...}` span, one per opening brace that closes.
///
/// Braces inside JSON strings are ignored. A stray `{` in surrounding prose
/// yields no span of its own, so later objects are still found.
pub fn balanced_objects(text: &str) -> impl Iterator<Item = &str> {
    text.match_indices('{')
        .filter_map(move |(start, _)| balanced_object_at(text, start))
}

fn balanced_object_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_object() {
        let parsed = parse_classification(
            r#"{"event_type": "Login Failure", "has_error": true, "user_action_successful": false, "is_critical": true}"#,
        )
        .unwrap();
        assert_eq!(parsed.event_type, "Login Failure");
        assert!(parsed.has_error);
        assert!(parsed.is_critical);
        assert!(parsed.extra.is_empty());
    }

    #[test]
    fn test_object_wrapped_in_prose() {
        let output = "Sure! Here is the analysis:\n{\"event_type\": \"Disk Warning\", \"has_error\": false}\nLet me know.";
        let parsed = parse_classification(output).unwrap();
        assert_eq!(parsed.event_type, "Disk Warning");
    }

    #[test]
    fn test_multiple_objects_take_first() {
        let output = r#"{"event_type": "A"} {"event_type": "B"}"#;
        assert_eq!(parse_classification(output).unwrap().event_type, "A");
    }

    #[test]
    fn test_braces_inside_strings() {
        let output = r#"note {"event_type": "Template {x} error", "url_path": "/a}b"} trailing }"#;
        let parsed = parse_classification(output).unwrap();
        assert_eq!(parsed.event_type, "Template {x} error");
        assert_eq!(parsed.url_path.as_deref(), Some("/a}b"));
    }

    #[test]
    fn test_nested_object_is_kept_whole() {
        let output = r#"result: {"event_type": "Deploy", "meta": {"region": "eu"}} done"#;
        let parsed = parse_classification(output).unwrap();
        assert_eq!(parsed.event_type, "Deploy");
        assert_eq!(parsed.extra["meta"]["region"], "eu");
    }

    #[test]
    fn test_stray_brace_before_object() {
        let output = "Note: the line has an unmatched { brace. Result: {\"event_type\": \"Disk Warning\", \"has_error\": false}";
        let parsed = parse_classification(output).unwrap();
        assert_eq!(parsed.event_type, "Disk Warning");
        assert!(!parsed.has_error);
    }

    #[test]
    fn test_invalid_span_is_skipped() {
        let output = r#"pseudo {event_type: Disk} then {"event_type": "Disk Warning"}"#;
        assert_eq!(parse_classification(output).unwrap().event_type, "Disk Warning");
    }

    #[test]
    fn test_balanced_objects_in_order() {
        let spans: Vec<&str> = balanced_objects(r#"x { {"a": {"b": 1}} {"c": "}"}"#).collect();
        assert_eq!(spans, vec![r#"{"a": {"b": 1}}"#, r#"{"b": 1}"#, r#"{"c": "}"}"#]);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(parse_classification("I cannot analyze this line.").is_err());
        assert!(parse_classification("{\"event_type\": \"unterminated\"").is_err());
        assert!(parse_classification("{ not json }").is_err());
    }

    #[test]
    fn test_lenient_fields() {
        let parsed = parse_classification(
            r#"{"event_type": null, "has_error": "true", "is_critical": 1, "user_action_successful": "no"}"#,
        )
        .unwrap();
        assert!(parsed.has_error);
        assert!(parsed.is_critical);
        assert!(!parsed.user_action_successful);
        assert_eq!(parsed.event_type_or_unknown(), "Unknown");
    }

    #[test]
    fn test_unknown_event_type() {
        let parsed = parse_classification("{}").unwrap();
        assert_eq!(parsed.event_type_or_unknown(), "Unknown");
    }
}
