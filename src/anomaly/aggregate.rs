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

//! Per-bucket aggregation of event metrics into sparse time series.

use super::bucket::{bucket, BucketKey, Granularity};
use crate::parser::line::Event;
use serde::Serialize;
use std::collections::btree_map;
use std::collections::BTreeMap;

/// Value type a [`TimeSeries`] can carry into the statistics.
pub trait MetricValue: Copy + PartialEq + std::fmt::Debug + Serialize {
    #[must_use]
    fn as_f64(self) -> f64;
}

impl MetricValue for u64 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl MetricValue for f64 {
    fn as_f64(self) -> f64 {
        self
    }
}

/// Sparse series of bucket aggregates, iterated in ascending bucket order.
///
/// Buckets without events are absent rather than zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries<V> {
    points: BTreeMap<BucketKey, V>,
}

impl<V: MetricValue> TimeSeries<V> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            points: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BucketKey, V)> + '_ {
        self.points.iter().map(|(k, v)| (*k, *v))
    }
}

impl<V: MetricValue> Default for TimeSeries<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: MetricValue> FromIterator<(BucketKey, V)> for TimeSeries<V> {
    fn from_iter<I: IntoIterator<Item = (BucketKey, V)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl<V> IntoIterator for TimeSeries<V> {
    type Item = (BucketKey, V);
    type IntoIter = btree_map::IntoIter<BucketKey, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

/// Feed each event's metric, paired with its bucket, to `sink`.
///
/// Events without a timestamp or without a value for the metric are skipped.
fn for_each_bucketed<'a, I, T, F, S>(
    events: I,
    granularity: Granularity,
    mut metric: F,
    mut sink: S,
)
where
    I: IntoIterator<Item = &'a Event>,
    F: FnMut(&Event) -> Option<T>,
    S: FnMut(BucketKey, T),
{
    for event in events {
        let Ok(key) = bucket(event.timestamp, granularity) else {
            tracing::trace!("Line {} has no timestamp, left out of bucketing", event.line_number);
            continue;
        };
        if let Some(value) = metric(event) {
            sink(key, value);
        }
    }
}

/// Number of events per bucket for which `include` holds.
#[must_use]
pub fn count_by_bucket<'a, I, F>(
    events: I,
    granularity: Granularity,
    mut include: F,
) -> TimeSeries<u64>
where
    I: IntoIterator<Item = &'a Event>,
    F: FnMut(&Event) -> bool,
{
    let mut series = TimeSeries::new();
    for_each_bucketed(
        events,
        granularity,
        |e| include(e).then_some(()),
        |key, ()| *series.points.entry(key).or_insert(0) += 1,
    );
    series
}

/// Mean of `metric` per bucket, over the events that have a value.
#[must_use]
pub fn mean_by_bucket<'a, I, F>(events: I, granularity: Granularity, metric: F) -> TimeSeries<f64>
where
    I: IntoIterator<Item = &'a Event>,
    F: FnMut(&Event) -> Option<f64>,
{
    let mut sums: BTreeMap<BucketKey, (f64, u64)> = BTreeMap::new();
    for_each_bucketed(events, granularity, metric, |key, value| {
        let (sum, n) = sums.entry(key).or_insert((0.0, 0));
        *sum += value;
        *n += 1;
    });

    sums.into_iter()
        .map(|(key, (sum, n))| (key, sum / n as f64))
        .collect()
}

/// Share of events per bucket for which `predicate` holds, in `[0, 1]`.
#[must_use]
pub fn ratio_by_bucket<'a, I, F>(
    events: I,
    granularity: Granularity,
    mut predicate: F,
) -> TimeSeries<f64>
where
    I: IntoIterator<Item = &'a Event>,
    F: FnMut(&Event) -> bool,
{
    mean_by_bucket(events, granularity, |e| {
        Some(if predicate(e) { 1.0 } else { 0.0 })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(10, m, s)
            .unwrap()
    }

    fn event(ts: Option<NaiveDateTime>, duration: Option<f64>, error: bool) -> Event {
        let mut e = Event::new(String::new(), 0);
        e.timestamp = ts;
        e.duration_ms = duration;
        if error {
            e.error = Some("boom".to_string());
        }
        e
    }

    fn key(m: u32) -> BucketKey {
        bucket(Some(at(m, 0)), Granularity::minute()).unwrap()
    }

    #[test]
    fn test_count_is_sparse_and_ordered() {
        let events = vec![
            event(Some(at(5, 10)), None, false),
            event(Some(at(1, 59)), None, false),
            event(Some(at(1, 0)), None, false),
            event(None, None, false),
        ];
        let series = count_by_bucket(&events, Granularity::minute(), |_| true);

        assert_eq!(series.len(), 2);
        assert_eq!(series.iter().collect::<Vec<_>>(), vec![(key(1), 2), (key(5), 1)]);
    }

    #[test]
    fn test_mean_skips_missing_values() {
        let events = vec![
            event(Some(at(1, 0)), Some(100.0), false),
            event(Some(at(1, 30)), Some(300.0), false),
            event(Some(at(1, 45)), None, false),
            event(Some(at(2, 0)), None, false),
        ];
        let series = mean_by_bucket(&events, Granularity::minute(), |e| e.duration_ms);

        assert_eq!(series.iter().collect::<Vec<_>>(), vec![(key(1), 200.0)]);
    }

    #[test]
    fn test_ratio() {
        let events = vec![
            event(Some(at(1, 0)), None, true),
            event(Some(at(1, 1)), None, false),
            event(Some(at(1, 2)), None, false),
            event(Some(at(1, 3)), None, true),
            event(Some(at(2, 0)), None, false),
        ];
        let series = ratio_by_bucket(&events, Granularity::minute(), Event::is_error);
        assert_eq!(
            series.iter().collect::<Vec<_>>(),
            vec![(key(1), 0.5), (key(2), 0.0)]
        );
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let mut events = vec![
            event(Some(at(3, 0)), None, false),
            event(Some(at(1, 0)), None, false),
            event(Some(at(2, 0)), None, false),
            event(Some(at(1, 5)), None, false),
        ];
        let forward = count_by_bucket(&events, Granularity::minute(), |_| true);
        events.reverse();
        let backward = count_by_bucket(&events, Granularity::minute(), |_| true);
        assert_eq!(forward, backward);
    }
}
