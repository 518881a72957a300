//! Similarity scoring between canonical keys.
//!
//! Scores are on a 0-100 scale. The combined score is the maximum of a
//! Levenshtein ratio and a token-sort ratio, so word order does not matter
//! ("TORAX RX" scores the same as "RX TORAX").

use rapidfuzz::distance::levenshtein;

use crate::canonical::CanonicalKey;

/// Maximum score, awarded to identical non-empty keys.
pub const MAX_SCORE: f64 = 100.0;

/// Levenshtein ratio between two strings.
///
/// `(max_len - distance) / max_len * 100`, with unit edit costs. When one
/// string contains the other the ratio is `min_len / max_len * 100` and the
/// edit distance is not computed. Empty inputs score 0.
pub fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let max_len = len_a.max(len_b) as f64;

    if a.contains(b) || b.contains(a) {
        return len_a.min(len_b) as f64 / max_len * MAX_SCORE;
    }

    let distance = levenshtein::distance(a.chars(), b.chars()) as f64;
    (max_len - distance) / max_len * MAX_SCORE
}

/// Levenshtein ratio after sorting whitespace-separated tokens.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    levenshtein_ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Combined similarity: the better of [`levenshtein_ratio`] and [`token_sort_ratio`].
///
/// Symmetric, bounded to `[0, 100]`, and 100 for identical non-empty keys.
pub fn similarity(a: &CanonicalKey, b: &CanonicalKey) -> f64 {
    similarity_str(a.as_str(), b.as_str())
}

/// [`similarity`] over raw strings (callers are expected to pass canonical text).
pub fn similarity_str(a: &str, b: &str) -> f64 {
    levenshtein_ratio(a, b).max(token_sort_ratio(a, b))
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canon;

    #[test]
    fn identical_keys_score_100() {
        let key = canon("HEMOGRAMA COMPLETO");
        assert_eq!(similarity(&key, &key), 100.0);
    }

    #[test]
    fn empty_keys_score_zero() {
        assert_eq!(levenshtein_ratio("", "ABC"), 0.0);
        assert_eq!(levenshtein_ratio("ABC", ""), 0.0);
        assert_eq!(similarity_str("", ""), 0.0);
    }

    #[test]
    fn substring_uses_length_ratio() {
        // "USG ABD" is inside "USG ABDOME": 7 / 10
        let score = levenshtein_ratio("USG ABD", "USG ABDOME");
        assert!((score - 70.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn edit_distance_ratio() {
        // kitten -> sitting: distance 3, max len 7
        let score = levenshtein_ratio("KITTEN", "SITTING");
        assert!((score - 400.0 / 7.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn token_order_is_ignored() {
        assert_eq!(token_sort_ratio("TORAX RX", "RX TORAX"), 100.0);
        assert_eq!(similarity_str("TORAX RX", "RX TORAX"), 100.0);
        assert!(levenshtein_ratio("TORAX RX", "RX TORAX") < 100.0);
    }

    #[test]
    fn abbreviated_alias_scores_above_default_threshold() {
        let score = similarity(&canon("USG ABD TOTAL"), &canon("USG ABDOME TOTAL"));
        assert!(score >= 75.0, "got {score}");
    }

    #[test]
    fn unrelated_keys_score_low() {
        let score = similarity(&canon("XYZPLACEHOLDER123"), &canon("HEMOGRAMA COMPLETO"));
        assert!(score < 40.0, "got {score}");
    }
}
