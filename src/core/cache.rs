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

//! Processed-log cache: classifications keyed by normalized content.
//!
//! Two independent checks are offered. [`DedupCache::lookup`] is the exact
//! path: one map access by content hash. [`DedupCache::find_reusable`] is
//! the fuzzy path: a linear scan, in insertion order, comparing the
//! normalized line against every cached one and stopping at the first entry
//! whose similarity reaches the cache's threshold. The scan is O(n) in the
//! number of cached entries, which stays small because entries are distinct
//! log patterns rather than raw lines.

use crate::classifier::Classification;
use crate::parser::normalize_line;
use fs2::FileExt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// One cached classification, in the persisted `{ "log", "parsed" }` shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub log: String,
    pub parsed: Classification,
    /// Normalized form of `log`, derived on insert and load
    #[serde(skip)]
    normalized: String,
}

impl CacheEntry {
    #[must_use]
    pub fn new(log: String, parsed: Classification) -> Self {
        let normalized = normalize_line(&log);
        Self {
            log,
            parsed,
            normalized,
        }
    }
}

/// Similarity of two strings in `[0, 1]`: twice the number of matching
/// characters over the total length. Identical strings score 1.0.
#[must_use]
pub fn similarity_ratio(a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }
    TextDiff::from_chars(a, b).ratio()
}

/// How a cache answered a lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheHit {
    Exact,
    Similar { ratio: f32 },
}

/// Cache capability handed to each unit of classification work.
///
/// Implementations must tolerate concurrent calls from the worker pool.
pub trait DedupCache: Send + Sync {
    /// Classification stored under exactly this content hash
    fn lookup(&self, key: &str) -> Option<Classification>;

    /// Classification of the first cached line similar enough to `normalized`
    fn find_reusable(&self, normalized: &str) -> Option<(Classification, f32)>;

    /// Store a fresh classification. Returns false if `key` was already
    /// present, in which case the existing entry is kept.
    fn insert(&self, key: String, raw: String, parsed: Classification) -> bool;
}

/// In-memory cache persisted as one JSON object per run.
pub struct ProcessedLogCache {
    entries: RwLock<IndexMap<String, CacheEntry>>,
    similarity_threshold: f32,
}

impl ProcessedLogCache {
    #[must_use]
    pub fn new(similarity_threshold: f32) -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            similarity_threshold,
        }
    }

    /// Load the cache from `path`.
    ///
    /// A missing, unreadable or corrupt file is a cold start, not an error.
    #[must_use]
    pub fn load(path: &Path, similarity_threshold: f32) -> Self {
        let cache = Self::new(similarity_threshold);

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No cache at {}, starting cold", path.display());
                return cache;
            }
            Err(e) => {
                tracing::warn!("Cannot read cache {}: {e}, starting cold", path.display());
                return cache;
            }
        };

        let stored: IndexMap<String, CacheEntry> = match serde_json::from_str(&contents) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Cannot parse cache {}: {e}, starting cold", path.display());
                return cache;
            }
        };

        let entries: IndexMap<String, CacheEntry> = stored
            .into_iter()
            .map(|(key, entry)| (key, CacheEntry::new(entry.log, entry.parsed)))
            .collect();
        tracing::info!(
            "Loaded {} cached classifications from {}",
            entries.len(),
            path.display()
        );

        *cache.entries.write().unwrap_or_else(PoisonError::into_inner) = entries;
        cache
    }

    /// Rewrite the whole cache file.
    ///
    /// The file is locked exclusively for the duration of the write so two
    /// runs sharing a cache don't interleave their output.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        file.lock_exclusive()?;
        let result = self.write_locked(&file);
        FileExt::unlock(&file)?;
        result?;

        tracing::info!("Saved {} cached classifications to {}", self.len(), path.display());
        Ok(())
    }

    fn write_locked(&self, file: &File) -> Result<(), CacheError> {
        file.set_len(0)?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &*entries)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DedupCache for ProcessedLogCache {
    fn lookup(&self, key: &str) -> Option<Classification> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|entry| entry.parsed.clone())
    }

    fn find_reusable(&self, normalized: &str) -> Option<(Classification, f32)> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().find_map(|entry| {
            let ratio = similarity_ratio(normalized, &entry.normalized);
            (ratio >= self.similarity_threshold).then(|| (entry.parsed.clone(), ratio))
        })
    }

    fn insert(&self, key: String, raw: String, parsed: Classification) -> bool {
        let entry = CacheEntry::new(raw, parsed);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&key) {
            return false;
        }
        entries.insert(key, entry);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::content_hash;

    fn classification(event_type: &str) -> Classification {
        Classification {
            event_type: event_type.to_string(),
            ..Classification::default()
        }
    }

    fn insert_line(cache: &ProcessedLogCache, raw: &str, event_type: &str) -> String {
        let key = content_hash(&normalize_line(raw));
        cache.insert(key.clone(), raw.to_string(), classification(event_type));
        key
    }

    #[test]
    fn test_volatile_fields_give_ratio_one() {
        let a =
            normalize_line("2025-03-01 10:15:32,123 ERROR db write failed request_id=a1, table=users");
        let b =
            normalize_line("2025-03-02 23:01:07,001 ERROR db write failed request_id=ff9, table=users");
        assert!((similarity_ratio(&a, &b) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_different_errors_do_not_match() {
        let a = normalize_line("ERROR storage: disk full");
        let b = normalize_line("ERROR storage: connection refused");
        assert!(similarity_ratio(&a, &b) < 0.95);

        let cache = ProcessedLogCache::new(0.95);
        insert_line(&cache, "ERROR storage: disk full", "Disk Full");
        assert!(cache.find_reusable(&b).is_none());
    }

    #[test]
    fn test_empty_cache_has_no_match() {
        let cache = ProcessedLogCache::new(0.9);
        assert!(cache.find_reusable("anything").is_none());
        assert!(cache.lookup("deadbeef").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_exact_lookup() {
        let cache = ProcessedLogCache::new(0.95);
        let key = insert_line(
            &cache,
            "2025-03-01 10:00:00 WARN disk space low on /var",
            "Disk Warning",
        );
        assert_eq!(cache.lookup(&key).unwrap().event_type, "Disk Warning");
    }

    #[test]
    fn test_first_hit_in_insertion_order() {
        let cache = ProcessedLogCache::new(0.8);
        insert_line(&cache, "user alice logged in from office", "First");
        insert_line(&cache, "user alicia logged in from office", "Second");

        let (hit, ratio) = cache.find_reusable("user alicia logged in from office").unwrap();
        assert_eq!(hit.event_type, "First");
        assert!(ratio >= 0.8 && ratio < 1.0);
    }

    #[test]
    fn test_threshold_is_per_instance() {
        let strict = ProcessedLogCache::new(0.95);
        let loose = ProcessedLogCache::new(0.6);
        for cache in [&strict, &loose] {
            insert_line(cache, "GET /api/users 200 12ms", "Http Request");
        }

        let candidate = "GET /api/orders 200 15ms";
        assert!(strict.find_reusable(candidate).is_none());
        assert!(loose.find_reusable(candidate).is_some());
    }

    #[test]
    fn test_insert_keeps_first_entry() {
        let cache = ProcessedLogCache::new(0.9);
        assert!(cache.insert("k".to_string(), "line".to_string(), classification("A")));
        assert!(!cache.insert("k".to_string(), "line".to_string(), classification("B")));
        assert_eq!(cache.lookup("k").unwrap().event_type, "A");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("processed_logs.json");

        let cache = ProcessedLogCache::new(0.9);
        let key = insert_line(&cache, "2025-03-01 10:00:00 ERROR kernel panic", "Kernel Panic");
        insert_line(&cache, "2025-03-01 10:00:01 INFO boot ok", "Boot");
        cache.save(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json[&key]["log"], "2025-03-01 10:00:00 ERROR kernel panic");
        assert_eq!(json[&key]["parsed"]["event_type"], "Kernel Panic");

        let reloaded = ProcessedLogCache::load(&path, 0.9);
        assert_eq!(reloaded.len(), 2);
        let entries = reloaded.entries.read().unwrap();
        let (first_key, first) = entries.first().unwrap();
        assert_eq!(first_key, &key);
        assert_eq!(first.normalized, "ERROR kernel panic");
        drop(entries);
        assert!(reloaded.find_reusable("ERROR kernel panic").is_some());
    }

    #[test]
    fn test_save_shrinks_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_logs.json");
        fs::write(&path, "x".repeat(10_000)).unwrap();

        ProcessedLogCache::new(0.9).save(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), "{}");
    }

    #[test]
    fn test_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProcessedLogCache::load(&dir.path().join("missing.json"), 0.9).is_empty());

        let corrupt = dir.path().join("corrupt.json");
        fs::write(&corrupt, "{ not json").unwrap();
        assert!(ProcessedLogCache::load(&corrupt, 0.9).is_empty());
    }

    #[test]
    fn test_unwritable_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory can't be opened as the cache file
        assert!(ProcessedLogCache::new(0.9).save(dir.path()).is_err());
    }
}
