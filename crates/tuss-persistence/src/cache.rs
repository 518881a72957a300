//! Write-through mapping cache.
//!
//! The cache is owned by a single engine: it is loaded once, mutated in
//! memory during a run and flushed with [`MappingCache::save`]. Concurrent
//! writers sharing one file are not supported.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};
use tuss_map::CanonicalKey;
use tuss_model::{CacheStats, Confidence};

use crate::error::Result;
use crate::io::{read_cache_file, write_cache_file};
use crate::types::{CacheEntry, CacheFile, CacheMetadata, CacheUpdate};

/// Default cache file name, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = "mapping_cache.json";

#[derive(Debug, Clone)]
pub struct MappingCache {
    path: PathBuf,
    file: CacheFile,
}

impl MappingCache {
    /// Empty cache that will be saved to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: CacheFile::new(Utc::now()),
        }
    }

    /// Load the cache at `path`.
    ///
    /// A missing, unreadable or corrupt file yields an empty cache; the
    /// problem is logged, not returned.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match read_cache_file(&path) {
            Ok(Some(file)) => Self { path, file },
            Ok(None) => {
                debug!(path = %path.display(), "no mapping cache yet, starting empty");
                Self::new(path)
            }
            Err(error) => {
                warn!(
                    path = %path.display(),
                    %error,
                    hint = %error.suggestion().unwrap_or_default(),
                    "mapping cache unreadable, starting empty"
                );
                Self::new(path)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &CacheMetadata {
        &self.file.metadata
    }

    pub fn len(&self) -> usize {
        self.file.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.mappings.is_empty()
    }

    /// Entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&CanonicalKey, &CacheEntry)> {
        self.file.mappings.iter()
    }

    /// Look up without touching usage statistics.
    pub fn peek(&self, key: &CanonicalKey) -> Option<&CacheEntry> {
        self.file.mappings.get(key)
    }

    /// Look up and record a use: refreshes `last_used` and bumps `use_count`.
    pub fn get(&mut self, key: &CanonicalKey) -> Option<&CacheEntry> {
        let entry = self.file.mappings.get_mut(key)?;
        entry.last_used = Utc::now();
        entry.use_count += 1;
        Some(entry)
    }

    /// Insert or replace the entry for `key`.
    ///
    /// `first_seen` survives replacement; `use_count` keeps counting.
    pub fn put(&mut self, key: CanonicalKey, update: CacheUpdate) {
        let now = Utc::now();
        let (first_seen, use_count) = self
            .file
            .mappings
            .get(&key)
            .map_or((now, 1), |previous| {
                (previous.first_seen, previous.use_count + 1)
            });

        let entry = CacheEntry {
            canonical_name: update.canonical_name,
            code: update.code,
            category: update.category,
            fallback_used: update.confidence == Confidence::Llm,
            confidence: update.confidence,
            score: update.score,
            first_seen,
            last_used: now,
            use_count,
            dictionary_version: update.dictionary_version,
        };
        self.file.mappings.insert(key, entry);
        self.file.metadata.updated_at = now;
        self.file.metadata.total_entries = self.file.mappings.len();
    }

    /// Persist the whole cache atomically.
    pub fn save(&mut self) -> Result<()> {
        self.file.metadata.total_entries = self.file.mappings.len();
        write_cache_file(&self.file, &self.path)
    }

    /// Count entries by confidence.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            total_entries: self.file.mappings.len(),
            ..CacheStats::default()
        };
        for entry in self.file.mappings.values() {
            match entry.confidence {
                Confidence::Exact => stats.exact_matches += 1,
                Confidence::Fuzzy => stats.fuzzy_matches += 1,
                Confidence::NoMatch => stats.no_matches += 1,
                Confidence::Llm => {}
            }
            if entry.fallback_used {
                stats.llm_fallbacks += 1;
            }
        }
        stats
    }
}
