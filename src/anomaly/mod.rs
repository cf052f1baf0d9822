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

pub mod aggregate;
pub mod bucket;
pub mod frequency;
pub mod severity;
pub mod window;

use crate::config::AnomalyConfig;
use crate::parser::line::Event;
use aggregate::{count_by_bucket, mean_by_bucket, ratio_by_bucket};
use frequency::frequency_anomalies;
use serde::Serialize;
use window::{windowed_anomalies, AnomalyRecord};

/// Statistical anomalies found in one batch of events
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricAnomalies {
    /// Buckets with an unusual number of log lines
    pub volume: Vec<AnomalyRecord<u64>>,
    /// Buckets with an unusual share of error lines
    pub error_ratio: Vec<AnomalyRecord<f64>>,
    /// Buckets with an unusual mean operation duration
    pub duration: Vec<AnomalyRecord<f64>>,
    /// Error messages that occur more often than the configured count
    pub error_messages: Vec<(String, usize)>,
}

impl MetricAnomalies {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.volume.is_empty()
            && self.error_ratio.is_empty()
            && self.duration.is_empty()
            && self.error_messages.is_empty()
    }
}

/// Run every detector over `events`.
///
/// Each metric gets its own series and the same windowed detector; events
/// without a timestamp only count towards the error-message frequencies.
#[must_use]
pub fn detect_metric_anomalies(events: &[Event], config: &AnomalyConfig) -> MetricAnomalies {
    let granularity = config.granularity();
    let (window, threshold) = (config.window, config.threshold);

    let volume = count_by_bucket(events, granularity, |_| true);
    let error_ratio = ratio_by_bucket(events, granularity, Event::is_error);
    let duration = mean_by_bucket(events, granularity, |e| e.duration_ms);
    tracing::debug!(
        "Series sizes: volume={}, error_ratio={}, duration={}",
        volume.len(),
        error_ratio.len(),
        duration.len()
    );

    let anomalies = MetricAnomalies {
        volume: windowed_anomalies(&volume, window, threshold),
        error_ratio: windowed_anomalies(&error_ratio, window, threshold),
        duration: windowed_anomalies(&duration, window, threshold),
        error_messages: frequency_anomalies(
            events.iter().filter_map(Event::error_label),
            config.error_min_count,
        ),
    };

    tracing::info!(
        "Detected {} volume, {} error ratio, {} duration and {} error message anomalies",
        anomalies.volume.len(),
        anomalies.error_ratio.len(),
        anomalies.duration.len(),
        anomalies.error_messages.len()
    );

    anomalies
}
