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

//! The external classifier boundary.
//!
//! Classifying a line is slow and non-deterministic, which is why the
//! pipeline goes to such lengths to avoid calling it twice for the same kind
//! of line.

pub mod ollama;
pub mod parse;

pub use ollama::OllamaClassifier;
pub use parse::{parse_classification, Classification, ClassificationParseError};

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("classifier request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("classifier returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("classifier failed: {0}")]
    Other(String),
}

/// Turns a raw log line into the model's textual answer.
///
/// The answer is expected to hold one JSON object; turning it into a
/// [`Classification`] is left to [`parse_classification`]. Timeouts and
/// retries, if any, are the implementation's business.
pub trait Classifier: Send + Sync {
    fn classify(&self, line: &str) -> Result<String, ClassifyError>;
}
