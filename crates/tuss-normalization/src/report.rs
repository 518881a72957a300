//! End-of-run summary.

use serde::Serialize;
use tuss_model::{CacheStats, SessionStats};

/// Session counters alongside the accumulated cache totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub session: SessionStats,
    pub cache: CacheStats,
}

impl SessionReport {
    /// Labelled rows in display order.
    pub fn rows(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("Exams normalized", self.session.total),
            ("Cache hits", self.session.cache_hits),
            ("Exact matches", self.session.exact),
            ("Fuzzy matches", self.session.fuzzy),
            ("Needs external resolution", self.session.llm_needed),
            ("No match", self.session.no_match),
            ("Cache entries (total)", self.cache.total_entries as u64),
        ]
    }
}
