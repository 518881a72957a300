//! Engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tuss_map::DEFAULT_TOP_N;
use tuss_persistence::DEFAULT_CACHE_FILE;

use crate::error::{NormalizeError, Result};

/// Minimum score for accepting a fuzzy candidate.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 75.0;

/// Fuzzy matches scoring below this are flagged for external resolution.
pub const DEFAULT_LLM_THRESHOLD: f64 = 80.0;

/// Options for [`ExamNormalizer`](crate::ExamNormalizer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub fuzzy_threshold: f64,
    pub llm_threshold: f64,
    /// Number of fuzzy candidates kept (best match plus alternatives).
    pub top_n: usize,
    pub cache_path: PathBuf,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            llm_threshold: DEFAULT_LLM_THRESHOLD,
            top_n: DEFAULT_TOP_N,
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
        }
    }
}

impl NormalizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_llm_threshold(mut self, threshold: f64) -> Self {
        self.llm_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    #[must_use]
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    /// Reject thresholds outside `0..=100` and a zero `top_n`.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("fuzzy_threshold", self.fuzzy_threshold),
            ("llm_threshold", self.llm_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(NormalizeError::InvalidConfig(format!(
                    "{name} must be between 0 and 100, got {value}"
                )));
            }
        }
        if self.top_n == 0 {
            return Err(NormalizeError::InvalidConfig(
                "top_n must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
