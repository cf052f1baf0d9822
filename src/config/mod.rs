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

use crate::anomaly::bucket::Granularity;
use crate::parser::extract::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Analyzer configuration, stored as JSON in the config directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub format: FormatConfig,
    pub anomaly: AnomalyConfig,
    pub dedup: DedupConfig,
    pub classifier: ClassifierConfig,
}

/// How raw lines are split into fields, and which fields mean what
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub log_format: LogFormat,
    pub delimiter: String,
    /// Column names for `csv`; taken from the first line when empty
    pub columns: Vec<String>,
    /// Named-capture regex for `custom`; a built-in pattern when unset
    pub pattern: Option<String>,
    pub timestamp_field: String,
    pub service_field: String,
    pub duration_field: String,
    pub user_field: String,
    pub error_field: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Custom,
            delimiter: ",".to_string(),
            columns: Vec::new(),
            pattern: None,
            timestamp_field: "timestamp".to_string(),
            service_field: "service".to_string(),
            duration_field: "duration".to_string(),
            user_field: "user".to_string(),
            error_field: "error".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Trailing window length, in present buckets
    pub window: usize,
    /// Multiple of the window standard deviation a bucket must exceed
    pub threshold: f64,
    pub granularity_secs: i64,
    /// Error messages seen more often than this are reported
    pub error_min_count: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            window: 5,
            threshold: 3.0,
            granularity_secs: 60,
            error_min_count: 10,
        }
    }
}

impl AnomalyConfig {
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        Granularity::from_secs(self.granularity_secs).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Minimum similarity ratio for reusing a cached classification
    pub similarity_threshold: f32,
    pub cache_path: PathBuf,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.90,
            cache_path: PathBuf::from("processed_logs.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    /// Concurrent classification workers
    pub workers: usize,
    pub timeout_secs: Option<u64>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            workers: 6,
            timeout_secs: None,
        }
    }
}

impl AnalyzerConfig {
    /// Default location of the config file
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("logsift").join("config.json"))
    }

    /// Load the config from `path`, or from the default location.
    ///
    /// A missing file yields the defaults. A file that exists but can't be
    /// read or parsed is an error rather than silently ignored.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    tracing::info!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        tracing::info!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let anomaly = &self.anomaly;
        if anomaly.window < 2 {
            return Err(ConfigError::Invalid(format!(
                "anomaly.window must be at least 2, got {}",
                anomaly.window
            )));
        }
        if !(anomaly.threshold.is_finite() && anomaly.threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "anomaly.threshold must be positive, got {}",
                anomaly.threshold
            )));
        }
        if Granularity::from_secs(anomaly.granularity_secs).is_none() {
            return Err(ConfigError::Invalid(format!(
                "anomaly.granularity_secs must be positive, got {}",
                anomaly.granularity_secs
            )));
        }
        let similarity = self.dedup.similarity_threshold;
        if !(similarity > 0.0 && similarity <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "dedup.similarity_threshold must be in (0, 1], got {similarity}"
            )));
        }
        if self.classifier.workers == 0 {
            return Err(ConfigError::Invalid(
                "classifier.workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
