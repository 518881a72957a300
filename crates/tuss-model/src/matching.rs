//! Match classification and normalization result types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a normalized name was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Canonical key matched a name or alias exactly.
    Exact,
    /// Best fuzzy candidate at or above the fuzzy threshold.
    Fuzzy,
    /// Resolved outside the engine (LLM or human operator).
    Llm,
    /// Nothing matched.
    NoMatch,
}

impl Confidence {
    /// Wire representation used in cache files and batch output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Llm => "llm",
            Self::NoMatch => "no_match",
        }
    }

    /// True for outcomes that carry a canonical exam.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::NoMatch)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fuzzy match candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// TUSS code of the candidate exam.
    #[serde(rename = "codigo_tuss")]
    pub code: String,
    /// Canonical name of the candidate exam.
    #[serde(rename = "nome_padrao")]
    pub canonical_name: String,
    /// Category of the candidate exam.
    #[serde(rename = "categoria")]
    pub category: String,
    /// Similarity score (0-100).
    pub score: f64,
    /// The indexed key (canonical name or alias) that produced the score.
    #[serde(rename = "matched_alias")]
    pub matched_alias_key: String,
}

/// Outcome of normalizing one free-text exam name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationResult {
    /// Input exactly as supplied by the caller.
    #[serde(rename = "nome_original")]
    pub original_name: String,
    /// Canonical exam name, when resolved.
    #[serde(rename = "nome_padrao")]
    pub canonical_name: Option<String>,
    /// Friendly display name, when resolved from the dictionary.
    #[serde(rename = "nome_comum", default)]
    pub friendly_name: Option<String>,
    /// TUSS code, when known.
    #[serde(rename = "codigo_tuss")]
    pub code: Option<String>,
    /// Category, when known.
    #[serde(rename = "categoria")]
    pub category: Option<String>,
    /// How the result was obtained.
    pub confidence: Confidence,
    /// Similarity score (100 for exact, 0 for no match).
    pub score: f64,
    /// Runner-up fuzzy candidates, best first.
    #[serde(default)]
    pub alternatives: Vec<Candidate>,
    /// Whether the result was served from the persistent cache.
    #[serde(rename = "_cache_hit", default)]
    pub cache_hit: bool,
    /// Whether the name should be resolved externally (LLM or human).
    #[serde(rename = "_needs_llm", default)]
    pub needs_external_resolution: bool,
}

impl NormalizationResult {
    /// An unresolved result for `original_name`.
    pub fn no_match(original_name: impl Into<String>) -> Self {
        Self {
            original_name: original_name.into(),
            canonical_name: None,
            friendly_name: None,
            code: None,
            category: None,
            confidence: Confidence::NoMatch,
            score: 0.0,
            alternatives: Vec::new(),
            cache_hit: false,
            needs_external_resolution: true,
        }
    }
}
