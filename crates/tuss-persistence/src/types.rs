//! On-disk layout of the mapping cache.
//!
//! ```text
//! { "metadata": {"created_at", "updated_at", "total_entries", "version"},
//!   "mappings": { CANONICAL_KEY: CacheEntry, ... } }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tuss_map::CanonicalKey;
use tuss_model::Confidence;

/// Cache file format version.
pub const CACHE_FORMAT_VERSION: &str = "1.0";

/// Whole-file metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub total_entries: usize,
    pub version: String,
}

impl CacheMetadata {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            total_entries: 0,
            version: CACHE_FORMAT_VERSION.to_string(),
        }
    }
}

/// Cached normalization result for one canonical key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "nome_padrao", default)]
    pub canonical_name: Option<String>,
    #[serde(rename = "codigo_tuss", default)]
    pub code: Option<String>,
    #[serde(rename = "categoria", default)]
    pub category: Option<String>,
    pub confidence: Confidence,
    pub score: f64,
    /// Set when the result came from external resolution.
    #[serde(default)]
    pub fallback_used: bool,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub first_seen: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub last_used: DateTime<Utc>,
    #[serde(default)]
    pub use_count: u64,
    /// Version of the dictionary the entry was computed against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary_version: Option<String>,
}

impl CacheEntry {
    /// True when the entry can be served for `dictionary_version`.
    ///
    /// Externally resolved entries survive dictionary changes; computed
    /// entries are only valid for the dictionary they were computed from.
    pub fn is_current(&self, dictionary_version: &str) -> bool {
        self.confidence == Confidence::Llm
            || self.dictionary_version.as_deref() == Some(dictionary_version)
    }
}

/// Values written by [`MappingCache::put`](crate::MappingCache::put).
#[derive(Debug, Clone, PartialEq)]
pub struct CacheUpdate {
    pub canonical_name: Option<String>,
    pub code: Option<String>,
    pub category: Option<String>,
    pub confidence: Confidence,
    pub score: f64,
    pub dictionary_version: Option<String>,
}

/// Serialized cache document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheFile {
    pub metadata: CacheMetadata,
    #[serde(default)]
    pub mappings: BTreeMap<CanonicalKey, CacheEntry>,
}

impl CacheFile {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            metadata: CacheMetadata::new(now),
            mappings: BTreeMap::new(),
        }
    }
}

/// Timestamps are written as RFC 3339. Files from older writers carry
/// local ISO 8601 times without an offset; those are read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub(super) fn parse(text: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(text, NAIVE_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse(&text).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {text}")))
    }
}
