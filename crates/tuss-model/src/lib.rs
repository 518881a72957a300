//! Data model for TUSS exam normalization.
//!
//! Shared by the dictionary loaders, the matching primitives, the mapping
//! cache and the normalization engine.

pub mod dictionary;
pub mod matching;
pub mod stats;

pub use dictionary::{DictionaryBlob, ExamRecord};
pub use matching::{Candidate, Confidence, NormalizationResult};
pub use stats::{CacheStats, SessionStats};
