//! Parsing dictionary blobs into typed records.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use tuss_model::{DictionaryBlob, ExamRecord};

use crate::error::{Result, StandardsError};
use crate::source::DictionarySource;

/// Parse raw JSON bytes into a [`DictionaryBlob`].
///
/// `origin` names the source in error messages (a path or URL).
pub fn parse_blob(bytes: &[u8], origin: &str) -> Result<DictionaryBlob> {
    let value: Value = serde_json::from_slice(bytes).map_err(|source| StandardsError::Json {
        origin: origin.to_string(),
        source,
    })?;
    if !value.get("exames").is_some_and(Value::is_array) {
        return Err(StandardsError::MissingExams {
            origin: origin.to_string(),
        });
    }
    serde_json::from_value(value).map_err(|source| StandardsError::Json {
        origin: origin.to_string(),
        source,
    })
}

/// A loaded dictionary: well-formed records plus provenance.
#[derive(Debug, Clone)]
pub struct Dictionary {
    pub meta: Map<String, Value>,
    pub records: Vec<ExamRecord>,
    /// Entries dropped because a required field was missing or mistyped.
    pub skipped_records: usize,
    /// SHA-256 over the accepted records, in load order.
    pub version: String,
}

impl Dictionary {
    /// Load a dictionary from any source.
    pub fn load(source: &dyn DictionarySource) -> Result<Self> {
        let blob = source.load()?;
        let dictionary = Self::from_blob(blob);
        info!(
            source = %source.describe(),
            records = dictionary.records.len(),
            skipped = dictionary.skipped_records,
            version = %dictionary.version,
            "dictionary loaded"
        );
        Ok(dictionary)
    }

    /// Convert a blob, skipping malformed entries.
    pub fn from_blob(blob: DictionaryBlob) -> Self {
        let mut records = Vec::with_capacity(blob.exams.len());
        let mut skipped_records = 0;

        for (position, value) in blob.exams.into_iter().enumerate() {
            match serde_json::from_value::<ExamRecord>(value) {
                Ok(record) => records.push(record),
                Err(error) => {
                    skipped_records += 1;
                    debug!(entry = position, %error, "skipping malformed dictionary entry");
                }
            }
        }

        let version = dictionary_version(&records);
        Self {
            meta: blob.meta,
            records,
            skipped_records,
            version,
        }
    }

    /// `_meta.version` as published by the dictionary builder.
    pub fn published_version(&self) -> Option<&str> {
        self.meta.get("version").and_then(Value::as_str)
    }
}

/// Content hash identifying a record list.
///
/// Any change to a code, name, category, alias or friendly name changes the
/// hash. Field boundaries are delimited so concatenations cannot collide.
pub fn dictionary_version(records: &[ExamRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        hasher.update(record.code.as_bytes());
        hasher.update([0x1f]);
        hasher.update(record.canonical_name.as_bytes());
        hasher.update([0x1f]);
        hasher.update(record.category.as_bytes());
        for alias in &record.aliases {
            hasher.update([0x1f]);
            hasher.update(alias.as_bytes());
        }
        hasher.update([0x1d]);
        if let Some(friendly) = &record.friendly_name {
            hasher.update(friendly.as_bytes());
        }
        hasher.update([0x1e]);
    }
    hex::encode(hasher.finalize())
}
