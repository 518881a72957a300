#![deny(unsafe_code)]

//! Matching primitives for exam names.
//!
//! - [`canon`] turns free text into a [`CanonicalKey`]
//! - [`similarity`] scores two keys on a 0-100 scale
//! - [`AliasIndex`] supports exact lookup and a full fuzzy scan

pub mod canonical;
pub mod index;
pub mod score;

pub use canonical::{CanonicalKey, canon};
pub use index::{AliasCollision, AliasIndex, DEFAULT_TOP_N, MatchOutcome};
pub use score::{MAX_SCORE, levenshtein_ratio, similarity, similarity_str, token_sort_ratio};
