//! TUSS dictionary types.
//!
//! The dictionary blob is the JSON document produced by the dictionary
//! builder. Its shape is:
//!
//! ```text
//! { "_meta": { ...free-form... },
//!   "exames": [
//!     { "codigo_tuss": "40301018", "nome_padrao": "...", "categoria": "...",
//!       "aliases": ["...", ...], "nome_comum": "..." }, ... ] }
//! ```
//!
//! Records are kept as raw JSON values inside [`DictionaryBlob`] so that a
//! single malformed record can be skipped without rejecting the whole blob.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single exam from the controlled vocabulary.
///
/// Immutable once a dictionary has been loaded for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamRecord {
    /// TUSS code, unique across the dictionary (e.g. "40301018").
    #[serde(rename = "codigo_tuss")]
    pub code: String,

    /// Canonical (standard) exam name.
    #[serde(rename = "nome_padrao")]
    pub canonical_name: String,

    /// Exam category (e.g. "Imagem", "Laboratorio").
    #[serde(rename = "categoria")]
    pub category: String,

    /// Alternate surface forms that resolve to this exam.
    pub aliases: Vec<String>,

    /// Friendlier display name, when the dictionary provides one.
    #[serde(
        rename = "nome_comum",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub friendly_name: Option<String>,
}

impl ExamRecord {
    /// Create a record without aliases.
    pub fn new(
        code: impl Into<String>,
        canonical_name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            canonical_name: canonical_name.into(),
            category: category.into(),
            aliases: Vec::new(),
            friendly_name: None,
        }
    }

    /// Add aliases to this record.
    #[must_use]
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Set the friendly display name.
    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Display name: the friendly name when present, otherwise the canonical name.
    pub fn display_name(&self) -> &str {
        self.friendly_name
            .as_deref()
            .unwrap_or(self.canonical_name.as_str())
    }
}

/// Raw dictionary document as delivered by a dictionary source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DictionaryBlob {
    /// Free-form metadata (version, build date, source table...).
    #[serde(rename = "_meta", default)]
    pub meta: Map<String, Value>,

    /// Exam records, unvalidated.
    #[serde(rename = "exames")]
    pub exams: Vec<Value>,
}

impl DictionaryBlob {
    /// Build a blob from typed records.
    pub fn from_records(records: &[ExamRecord]) -> Self {
        let exams = records
            .iter()
            .filter_map(|record| serde_json::to_value(record).ok())
            .collect();
        Self {
            meta: Map::new(),
            exams,
        }
    }

    /// Value of `_meta.version`, if present and a string.
    pub fn meta_version(&self) -> Option<&str> {
        self.meta.get("version").and_then(Value::as_str)
    }
}
