//! Property tests for canonicalization and scoring.

use proptest::prelude::*;

use tuss_map::{AliasIndex, canon, similarity, similarity_str};
use tuss_model::ExamRecord;

proptest! {
    #[test]
    fn canon_is_idempotent(text in "\\PC{0,40}") {
        let once = canon(&text);
        let twice = canon(once.as_str());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn canon_output_uses_key_alphabet(text in "\\PC{0,40}") {
        let key = canon(&text);
        let in_alphabet = key.as_str().chars().all(|c| {
            c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, ' ' | '-' | '/' | '(' | ')')
        });
        prop_assert!(in_alphabet);
        prop_assert!(!key.as_str().starts_with(' '));
        prop_assert!(!key.as_str().ends_with(' '));
        prop_assert!(!key.as_str().contains("  "));
    }

    #[test]
    fn canon_ignores_case(text in "[a-zA-Z ]{0,30}") {
        prop_assert_eq!(canon(&text.to_lowercase()), canon(&text.to_uppercase()));
    }

    #[test]
    fn score_is_symmetric_and_bounded(a in "[A-Z0-9 ]{0,20}", b in "[A-Z0-9 ]{0,20}") {
        let ka = canon(&a);
        let kb = canon(&b);
        let ab = similarity(&ka, &kb);
        let ba = similarity(&kb, &ka);
        prop_assert!((ab - ba).abs() < 1e-9);
        prop_assert!((0.0..=100.0).contains(&ab));
    }

    #[test]
    fn score_identity(a in "[A-Z0-9]{1,10}( [A-Z0-9]{1,10}){0,3}") {
        prop_assert_eq!(similarity_str(&a, &a), 100.0);
    }

    #[test]
    fn raising_threshold_never_adds_candidates(
        query in "[A-Z]{2,8} [A-Z]{2,8}",
        low in 0.0f64..100.0,
        delta in 0.0f64..50.0,
    ) {
        let index = AliasIndex::build(vec![
            ExamRecord::new("1", "Hemograma completo", "Lab").with_aliases(["HMG COMPLETO"]),
            ExamRecord::new("2", "Radiografia de torax", "Imagem").with_aliases(["RX TORAX"]),
            ExamRecord::new("3", "Ultrassonografia de abdome total", "Imagem")
                .with_aliases(["USG ABDOME TOTAL"]),
        ]);
        let key = canon(&query);
        let loose = index.fuzzy_scan(&key, low, 10).len();
        let strict = index.fuzzy_scan(&key, low + delta, 10).len();
        prop_assert!(strict <= loose);
    }
}
