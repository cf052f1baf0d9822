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

//! Analysis report: classification totals plus the statistical anomalies.

use crate::anomaly::severity::Severity;
use crate::anomaly::MetricAnomalies;
use crate::core::pipeline::{ClassifiedLine, PipelineOutput, PipelineStats};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const DEFAULT_REPORT_PATH: &str = "results/report.json";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to serialize report: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A line flagged critical, kept for the summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriticalLine {
    pub line_number: usize,
    pub event_type: String,
    pub severity: Severity,
    pub raw: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub total_logs: usize,
    pub critical_logs: usize,
    pub non_critical_logs: usize,
    /// Event type of every classified line, in line order
    pub events: Vec<String>,
    /// Lines per event type, in first-seen order
    pub event_type_distribution: IndexMap<String, usize>,
    /// Lines per severity, least severe first
    pub severity_counts: BTreeMap<Severity, usize>,
    pub critical: Vec<CriticalLine>,
    pub anomalies: MetricAnomalies,
    pub dropped_lines: usize,
    /// Absent when classification was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<PipelineStats>,
}

impl Report {
    #[must_use]
    pub fn new(anomalies: MetricAnomalies) -> Self {
        Self {
            anomalies,
            ..Self::default()
        }
    }

    /// Report over the anomalies and, when classification ran, its output
    #[must_use]
    pub fn from_run(anomalies: MetricAnomalies, classified: Option<&PipelineOutput>) -> Self {
        let mut report = Self::new(anomalies);
        if let Some(output) = classified {
            for line in &output.lines {
                report.record(line);
            }
            report.dropped_lines = output.stats.dropped;
            report.cache = Some(output.stats);
        }
        report
    }

    pub fn record(&mut self, line: &ClassifiedLine) {
        let event_type = line.classification.event_type_or_unknown().to_string();

        self.total_logs += 1;
        if line.is_critical {
            self.critical_logs += 1;
            self.critical.push(CriticalLine {
                line_number: line.line_number,
                event_type: event_type.clone(),
                severity: line.severity,
                raw: line.raw.clone(),
            });
        } else {
            self.non_critical_logs += 1;
        }

        *self.severity_counts.entry(line.severity).or_insert(0) += 1;
        *self
            .event_type_distribution
            .entry(event_type.clone())
            .or_insert(0) += 1;
        self.events.push(event_type);
    }

    pub fn export_json(&self, path: &Path) -> Result<(), ReportError> {
        let file = create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(|source| io_error(path, source))?;
        tracing::info!("Report written to {}", path.display());
        Ok(())
    }

    /// `Index,Event Type` rows, one per classified line
    pub fn export_csv(&self, path: &Path) -> Result<(), ReportError> {
        let mut writer = BufWriter::new(create(path)?);
        let mut write = || -> std::io::Result<()> {
            writeln!(writer, "Index,Event Type")?;
            for (i, event) in self.events.iter().enumerate() {
                writeln!(writer, "{},{}", i + 1, csv_field(event))?;
            }
            writer.flush()
        };
        write().map_err(|source| io_error(path, source))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ReportError {
    ReportError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn create(path: &Path) -> Result<fs::File, ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| io_error(path, source))?;
    }
    fs::File::create(path).map_err(|source| io_error(path, source))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ANALYSIS REPORT")?;

        if let Some(stats) = &self.cache {
            writeln!(f, "Total logs:        {}", self.total_logs)?;
            writeln!(f, "Critical logs:     {}", self.critical_logs)?;
            writeln!(f, "Non-critical logs: {}", self.non_critical_logs)?;
            writeln!(f, "Dropped lines:     {}", self.dropped_lines)?;
            writeln!(
                f,
                "Cache:             {} exact, {} similar, {} classifier calls",
                stats.exact_hits, stats.similar_hits, stats.classifier_calls
            )?;

            if !self.event_type_distribution.is_empty() {
                writeln!(f, "Event types:")?;
                for (i, (event_type, count)) in self.event_type_distribution.iter().enumerate() {
                    writeln!(f, "  {}. {event_type} ({count})", i + 1)?;
                }
            }

            if !self.severity_counts.is_empty() {
                let counts: Vec<String> = self
                    .severity_counts
                    .iter()
                    .rev()
                    .map(|(severity, count)| format!("{count} {severity}"))
                    .collect();
                writeln!(f, "Severity:          {}", counts.join(", "))?;
            }

            if !self.critical.is_empty() {
                writeln!(f, "Critical lines:")?;
                for line in &self.critical {
                    writeln!(
                        f,
                        "  #{} [{}, {}] {}",
                        line.line_number, line.event_type, line.severity, line.raw
                    )?;
                }
            }
        } else {
            writeln!(f, "Classification skipped")?;
        }

        let anomalies = &self.anomalies;
        if anomalies.is_empty() {
            return writeln!(f, "No anomalies detected");
        }

        if !anomalies.volume.is_empty() {
            writeln!(f, "Log volume anomalies:")?;
            for a in &anomalies.volume {
                writeln!(
                    f,
                    "  {}: {} lines (window mean {:.1}, std {:.2}, z {:.1})",
                    a.bucket,
                    a.observed,
                    a.mean,
                    a.std_dev,
                    a.z_score()
                )?;
            }
        }
        if !anomalies.error_ratio.is_empty() {
            writeln!(f, "Error ratio anomalies:")?;
            for a in &anomalies.error_ratio {
                writeln!(
                    f,
                    "  {}: {:.1}% errors (window mean {:.1}%)",
                    a.bucket,
                    a.observed * 100.0,
                    a.mean * 100.0
                )?;
            }
        }
        if !anomalies.duration.is_empty() {
            writeln!(f, "Duration anomalies:")?;
            for a in &anomalies.duration {
                writeln!(
                    f,
                    "  {}: mean {:.1} ms (window mean {:.1} ms)",
                    a.bucket, a.observed, a.mean
                )?;
            }
        }
        if !anomalies.error_messages.is_empty() {
            writeln!(f, "Frequent error messages:")?;
            for (message, count) in &anomalies.error_messages {
                writeln!(f, "  {count}x {message}")?;
            }
        }
        Ok(())
    }
}
