//! Counters reported at the end of a normalization run.

use serde::{Deserialize, Serialize};

use crate::matching::Confidence;

/// Per-session outcome counters, reset when an engine is constructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total: u64,
    pub cache_hits: u64,
    pub exact: u64,
    pub fuzzy: u64,
    pub llm_needed: u64,
    pub no_match: u64,
}

impl SessionStats {
    /// Count a freshly computed outcome.
    pub fn record_outcome(&mut self, confidence: Confidence, needs_external_resolution: bool) {
        self.total += 1;
        match confidence {
            Confidence::Exact => self.exact += 1,
            Confidence::Fuzzy => self.fuzzy += 1,
            Confidence::NoMatch => self.no_match += 1,
            Confidence::Llm => {}
        }
        if needs_external_resolution {
            self.llm_needed += 1;
        }
    }

    /// Count a result served from the mapping cache.
    pub fn record_cache_hit(&mut self) {
        self.total += 1;
        self.cache_hits += 1;
    }
}

/// Totals over every entry in a mapping cache, grouped by confidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub exact_matches: usize,
    pub fuzzy_matches: usize,
    pub llm_fallbacks: usize,
    pub no_matches: usize,
}
