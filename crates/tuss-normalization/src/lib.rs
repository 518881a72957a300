#![deny(unsafe_code)]

//! Exam-name normalization engine.
//!
//! [`ExamNormalizer`] maps free-text exam names to TUSS codes:
//!
//! 1. the mapping cache, when its entry is current for the loaded dictionary
//! 2. exact alias lookup (score 100)
//! 3. fuzzy scan at or above `fuzzy_threshold`
//! 4. `no_match`
//!
//! Fuzzy results below `llm_threshold` and unmatched names are flagged for
//! external resolution; [`ExamNormalizer::apply_external_result`] records the
//! answer so later runs hit the cache.

pub mod config;
pub mod contrib;
pub mod engine;
pub mod error;
pub mod prompt;
pub mod report;

pub use config::{DEFAULT_FUZZY_THRESHOLD, DEFAULT_LLM_THRESHOLD, NormalizerConfig};
pub use contrib::{
    ContributionEntry, ContributionQueue, DEFAULT_CONTRIB_FILE, FlushReport, FlushStatus,
    LocalContributionQueue,
};
pub use engine::{EXTERNAL_RESOLUTION_SCORE, ExamNormalizer};
pub use error::{NormalizeError, Result};
pub use prompt::resolution_prompt;
pub use report::SessionReport;
