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

//! Sliding-window z-score detection over sparse bucket series.
//!
//! The window counts *present* buckets, not wall-clock time: when a series has
//! idle gaps, a five bucket window stretches over more than five bucket widths.

use super::aggregate::{MetricValue, TimeSeries};
use super::bucket::BucketKey;
use serde::Serialize;

/// Baselines with a standard deviation below this are treated as constant
const MIN_STD_DEV: f64 = 1e-10;

/// A bucket whose value rose above its trailing baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRecord<V> {
    pub bucket: BucketKey,
    pub observed: V,
    /// Mean of the trailing window
    pub mean: f64,
    /// Population standard deviation of the trailing window
    pub std_dev: f64,
    /// Multiple of `std_dev` the value had to exceed
    pub threshold: f64,
}

impl<V: MetricValue> AnomalyRecord<V> {
    #[must_use]
    pub fn z_score(&self) -> f64 {
        (self.observed.as_f64() - self.mean) / self.std_dev
    }
}

/// Mean and population standard deviation (divisor `n`).
#[must_use]
pub fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn as_values<V: MetricValue>(points: &[(BucketKey, V)]) -> Vec<f64> {
    points.iter().map(|(_, v)| v.as_f64()).collect()
}

/// Flag buckets whose value exceeds `mean + threshold * std_dev` of the
/// `window` buckets before it.
///
/// Only buckets with a full window of predecessors are examined, so series
/// with no more than `window` buckets yield nothing. A bucket is skipped when
/// either its baseline or the `window` buckets ending at it are constant.
#[must_use]
pub fn windowed_anomalies<V: MetricValue>(
    series: &TimeSeries<V>,
    window: usize,
    threshold: f64,
) -> Vec<AnomalyRecord<V>> {
    let points: Vec<(BucketKey, V)> = series.iter().collect();
    if window == 0 || points.len() <= window {
        return Vec::new();
    }

    points
        .windows(window + 1)
        .filter_map(|span| {
            let (baseline, current) = span.split_at(window);
            let (bucket, observed) = current[0];

            let (mean, std_dev) = mean_and_std_dev(&as_values(baseline));
            if std_dev < MIN_STD_DEV {
                return None;
            }
            // The window ending at this bucket, the bucket included
            let (_, trailing_std) = mean_and_std_dev(&as_values(&span[1..]));
            if trailing_std < MIN_STD_DEV {
                return None;
            }

            (observed.as_f64() > threshold.mul_add(std_dev, mean)).then_some(AnomalyRecord {
                bucket,
                observed,
                mean,
                std_dev,
                threshold,
            })
        })
        .collect()
}
