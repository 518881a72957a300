//! Cache loading operations.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};
use tuss_map::{CanonicalKey, canon};

use crate::error::{PersistenceError, Result};
use crate::types::{CacheEntry, CacheFile, CacheMetadata};

/// Document shape before individual entries are checked.
#[derive(Deserialize)]
struct RawCacheFile {
    #[serde(default)]
    metadata: Option<Value>,
    #[serde(default)]
    mappings: Map<String, Value>,
}

/// Read a cache file.
///
/// Returns `Ok(None)` when the file does not exist and an error when the
/// document is not a JSON object. Malformed entries are dropped one by one,
/// and keys are re-canonicalized so files written by older tools still hit.
pub fn read_cache_file(path: &Path) -> Result<Option<CacheFile>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PersistenceError::Io {
                operation: "read",
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let raw: RawCacheFile =
        serde_json::from_slice(&bytes).map_err(|e| PersistenceError::Deserialization {
            path: path.to_path_buf(),
            source: e,
        })?;

    let mut metadata = match raw.metadata.map(serde_json::from_value::<CacheMetadata>) {
        Some(Ok(metadata)) => metadata,
        Some(Err(error)) => {
            warn!(%error, "mapping cache metadata unreadable, resetting it");
            CacheMetadata::new(Utc::now())
        }
        None => CacheMetadata::new(Utc::now()),
    };

    let mut mappings: BTreeMap<CanonicalKey, CacheEntry> = BTreeMap::new();
    let mut dropped = 0usize;
    for (position, (raw_key, value)) in raw.mappings.into_iter().enumerate() {
        let key = canon(&raw_key);
        if key.is_empty() {
            dropped += 1;
            continue;
        }
        let entry = match serde_json::from_value::<CacheEntry>(value) {
            Ok(entry) => entry,
            Err(error) => {
                dropped += 1;
                warn!(entry = position, %error, "dropping malformed mapping cache entry");
                continue;
            }
        };
        insert_most_recent(&mut mappings, key, entry);
    }
    metadata.total_entries = mappings.len();

    info!(
        path = %path.display(),
        entries = mappings.len(),
        dropped,
        "loaded mapping cache"
    );
    Ok(Some(CacheFile { metadata, mappings }))
}

/// Keys that only differed by accents or spacing collapse into one; the
/// most recently used entry survives.
fn insert_most_recent(
    mappings: &mut BTreeMap<CanonicalKey, CacheEntry>,
    key: CanonicalKey,
    entry: CacheEntry,
) {
    match mappings.get(&key) {
        Some(existing) if existing.last_used >= entry.last_used => {}
        _ => {
            mappings.insert(key, entry);
        }
    }
}
