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

//! Classification pipeline.
//!
//! Lines are grouped by the hash of their normalized text, so a batch with
//! many copies of the same line costs one unit of work. Each unit then tries
//! the exact cache entry, the fuzzy scan, and only then the classifier. Units
//! run on a bounded rayon pool; the classifier call happens without holding
//! any cache lock.
//!
//! Two near-duplicate lines classified at the same moment by different
//! workers can both miss the fuzzy scan and both reach the classifier. Each
//! stores its own entry. This costs one redundant call and is accepted.

use super::cache::{CacheHit, DedupCache};
use crate::anomaly::severity::{is_critical, Severity};
use crate::classifier::{parse_classification, Classification, Classifier};
use crate::parser::line::Event;
use crate::parser::{content_hash, normalize_line};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const DEFAULT_WORKERS: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Where a line's classification came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    ExactCache,
    SimilarCache { ratio: f32 },
    Classifier,
}

impl From<CacheHit> for Origin {
    fn from(hit: CacheHit) -> Self {
        match hit {
            CacheHit::Exact => Self::ExactCache,
            CacheHit::Similar { ratio } => Self::SimilarCache { ratio },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedLine {
    pub line_number: usize,
    pub raw: String,
    pub classification: Classification,
    pub origin: Origin,
    pub severity: Severity,
    pub is_critical: bool,
}

/// Counters for one pipeline run, per input line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub exact_hits: usize,
    pub similar_hits: usize,
    pub classifier_calls: usize,
    pub dropped: usize,
}

#[derive(Default)]
struct Counters {
    exact_hits: AtomicUsize,
    similar_hits: AtomicUsize,
    classifier_calls: AtomicUsize,
    dropped: AtomicUsize,
}

impl Counters {
    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            exact_hits: self.exact_hits.load(Ordering::Relaxed),
            similar_hits: self.similar_hits.load(Ordering::Relaxed),
            classifier_calls: self.classifier_calls.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
pub struct PipelineOutput {
    /// Classified lines, ascending by line number
    pub lines: Vec<ClassifiedLine>,
    pub stats: PipelineStats,
}

/// Lines sharing one normalized form
struct WorkUnit<'e> {
    key: String,
    normalized: String,
    events: Vec<&'e Event>,
}

fn group_by_content(events: &[Event]) -> Vec<WorkUnit<'_>> {
    let mut units: IndexMap<String, WorkUnit<'_>> = IndexMap::new();
    for event in events {
        let normalized = normalize_line(&event.raw);
        let key = content_hash(&normalized);
        units
            .entry(key.clone())
            .or_insert_with(|| WorkUnit {
                key,
                normalized,
                events: Vec::new(),
            })
            .events
            .push(event);
    }
    units.into_values().collect()
}

pub struct Pipeline<'a> {
    classifier: &'a dyn Classifier,
    cache: &'a dyn DedupCache,
    workers: usize,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub const fn new(classifier: &'a dyn Classifier, cache: &'a dyn DedupCache) -> Self {
        Self {
            classifier,
            cache,
            workers: DEFAULT_WORKERS,
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Classify every event, reusing cached results where possible.
    ///
    /// Lines whose classifier output can't be parsed, or whose classifier
    /// call fails, are dropped with a warning and counted in
    /// [`PipelineStats::dropped`].
    pub fn run(&self, events: &[Event]) -> Result<PipelineOutput, PipelineError> {
        let units = group_by_content(events);
        tracing::info!(
            "Classifying {} lines ({} distinct) on {} workers",
            events.len(),
            units.len(),
            self.workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("classify-{i}"))
            .build()?;

        let counters = Counters::default();
        let mut lines: Vec<ClassifiedLine> = pool.install(|| {
            units
                .par_iter()
                .flat_map_iter(|unit| self.process(unit, &counters))
                .collect()
        });
        lines.sort_by_key(|line| line.line_number);

        let stats = counters.snapshot();
        tracing::info!(
            "Classification done: {} exact hits, {} similar hits, {} classifier calls, {} dropped",
            stats.exact_hits,
            stats.similar_hits,
            stats.classifier_calls,
            stats.dropped
        );
        Ok(PipelineOutput { lines, stats })
    }

    fn process(&self, unit: &WorkUnit<'_>, counters: &Counters) -> Vec<ClassifiedLine> {
        let Some((&first, rest)) = unit.events.split_first() else {
            return Vec::new();
        };

        let Some((classification, origin)) = self.resolve(unit, first) else {
            counters.dropped.fetch_add(unit.events.len(), Ordering::Relaxed);
            return Vec::new();
        };

        let first_counter = match origin {
            Origin::ExactCache => &counters.exact_hits,
            Origin::SimilarCache { .. } => &counters.similar_hits,
            Origin::Classifier => &counters.classifier_calls,
        };
        first_counter.fetch_add(1, Ordering::Relaxed);
        // Repeats of a line within the batch reuse the result exactly
        counters.exact_hits.fetch_add(rest.len(), Ordering::Relaxed);

        let classified = |event: &Event, origin: Origin| ClassifiedLine {
            line_number: event.line_number,
            raw: event.raw.clone(),
            severity: Severity::of_line(&event.raw, event.level),
            is_critical: is_critical(&classification, &event.raw),
            classification: classification.clone(),
            origin,
        };

        std::iter::once(classified(first, origin))
            .chain(rest.iter().map(|&event| classified(event, Origin::ExactCache)))
            .collect()
    }

    fn resolve(&self, unit: &WorkUnit<'_>, event: &Event) -> Option<(Classification, Origin)> {
        if let Some(hit) = self.cache.lookup(&unit.key) {
            tracing::trace!("Line {}: exact cache hit", event.line_number);
            return Some((hit, CacheHit::Exact.into()));
        }

        if let Some((hit, ratio)) = self.cache.find_reusable(&unit.normalized) {
            tracing::trace!("Line {}: similar cache hit ({ratio:.3})", event.line_number);
            return Some((hit, CacheHit::Similar { ratio }.into()));
        }

        let output = match self.classifier.classify(&event.raw) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("Dropping line {}: {e}", event.line_number);
                return None;
            }
        };

        match parse_classification(&output) {
            Ok(parsed) => {
                self.cache
                    .insert(unit.key.clone(), event.raw.clone(), parsed.clone());
                Some((parsed, Origin::Classifier))
            }
            Err(e) => {
                tracing::warn!("Dropping line {}: {e}", event.line_number);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifyError;
    use crate::core::cache::ProcessedLogCache;
    use crate::parser::line::LogLevel;
    use std::sync::Mutex;

    /// Answers with a JSON object naming the line, and remembers every call
    #[derive(Default)]
    struct CountingClassifier {
        calls: Mutex<Vec<String>>,
    }

    impl CountingClassifier {
        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Classifier for CountingClassifier {
        fn classify(&self, line: &str) -> Result<String, ClassifyError> {
            self.calls.lock().unwrap().push(line.to_string());
            if line.contains("garbage") {
                return Ok("I am not sure what this line means.".to_string());
            }
            if line.contains("unreachable") {
                return Err(ClassifyError::Other("model offline".to_string()));
            }
            let is_error = line.contains("ERROR");
            Ok(format!(
                "Sure! {{\"event_type\": \"{}\", \"has_error\": {is_error}, \"user_action_successful\": {}, \"is_critical\": false}}",
                normalize_line(line),
                !is_error
            ))
        }
    }

    fn events(lines: &[&str]) -> Vec<Event> {
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| Event::new((*line).to_string(), i + 1))
            .collect()
    }

    #[test]
    fn test_distinct_lines_call_classifier_each() {
        let classifier = CountingClassifier::default();
        let cache = ProcessedLogCache::new(0.95);
        let input = events(&[
            "INFO user alice logged in",
            "ERROR storage: disk full",
            "WARN queue depth 9000 exceeds limit",
            "DEBUG cache warmed in 3s",
        ]);

        let output = Pipeline::new(&classifier, &cache)
            .with_workers(3)
            .run(&input)
            .unwrap();

        assert_eq!(classifier.calls(), 4);
        assert_eq!(output.stats.classifier_calls, 4);
        assert_eq!(output.lines.len(), 4);
        assert_eq!(cache.len(), 4);
        let numbers: Vec<usize> = output.lines.iter().map(|l| l.line_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_repeated_lines_classified_once() {
        let classifier = CountingClassifier::default();
        let cache = ProcessedLogCache::new(0.95);
        let input = events(&[
            "2025-03-01 10:00:00 ERROR db timeout request_id=1, table=orders",
            "2025-03-01 10:00:05 ERROR db timeout request_id=2, table=orders",
            "2025-03-01 10:00:09 ERROR db timeout request_id=3, table=orders",
        ]);

        let output = Pipeline::new(&classifier, &cache).run(&input).unwrap();

        assert_eq!(classifier.calls(), 1);
        assert_eq!(output.stats.classifier_calls, 1);
        assert_eq!(output.stats.exact_hits, 2);
        assert_eq!(output.lines[0].origin, Origin::Classifier);
        assert!(output.lines[1..]
            .iter()
            .all(|l| l.origin == Origin::ExactCache));
    }

    #[test]
    fn test_cached_results_are_reused_across_runs() {
        let classifier = CountingClassifier::default();
        let cache = ProcessedLogCache::new(0.9);
        let pipeline = Pipeline::new(&classifier, &cache);

        pipeline
            .run(&events(&["ERROR payment gateway returned 502 for order 1234"]))
            .unwrap();
        let output = pipeline
            .run(&events(&[
                "ERROR payment gateway returned 502 for order 1234",
                "ERROR payment gateway returned 502 for order 1299",
            ]))
            .unwrap();

        assert_eq!(classifier.calls(), 1);
        assert_eq!(output.stats.exact_hits, 1);
        assert_eq!(output.stats.similar_hits, 1);
        assert!(matches!(output.lines[1].origin, Origin::SimilarCache { ratio } if ratio >= 0.9));
        assert_eq!(
            output.lines[1].classification.event_type,
            "ERROR payment gateway returned 502 for order 1234"
        );
    }

    #[test]
    fn test_unusable_output_drops_line() {
        let classifier = CountingClassifier::default();
        let cache = ProcessedLogCache::new(0.95);
        let input = events(&[
            "INFO garbage ahead",
            "INFO garbage ahead",
            "ERROR upstream unreachable",
            "INFO all good",
        ]);

        let output = Pipeline::new(&classifier, &cache).run(&input).unwrap();

        assert_eq!(output.stats.dropped, 3);
        assert_eq!(output.lines.len(), 1);
        assert_eq!(output.lines[0].raw, "INFO all good");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_critical_phrase_marks_line() {
        let classifier = CountingClassifier::default();
        let cache = ProcessedLogCache::new(0.95);
        let output = Pipeline::new(&classifier, &cache)
            .run(&events(&["ERROR kernel panic - not syncing", "INFO heartbeat"]))
            .unwrap();

        assert!(output.lines[0].is_critical);
        assert!(!output.lines[1].is_critical);
    }

    #[test]
    fn test_severity_from_level_and_wording() {
        let classifier = CountingClassifier::default();
        let cache = ProcessedLogCache::new(0.95);
        let mut input = events(&["db write refused", "queue depth 9000", "GET /health 200"]);
        input[1].level = LogLevel::Warning;

        let output = Pipeline::new(&classifier, &cache).run(&input).unwrap();
        let severities: Vec<Severity> = output.lines.iter().map(|l| l.severity).collect();
        assert_eq!(severities, vec![Severity::Failure, Severity::Warning, Severity::None]);
    }

    #[test]
    fn test_empty_input() {
        let classifier = CountingClassifier::default();
        let cache = ProcessedLogCache::new(0.95);
        let output = Pipeline::new(&classifier, &cache).run(&[]).unwrap();
        assert!(output.lines.is_empty());
        assert_eq!(output.stats, PipelineStats::default());
        assert_eq!(classifier.calls(), 0);
    }
}
