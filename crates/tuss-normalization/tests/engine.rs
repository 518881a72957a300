use serde_json::{Map, Value, json};
use tempfile::TempDir;
use tuss_model::{Confidence, DictionaryBlob, ExamRecord};
use tuss_normalization::{
    ExamNormalizer, FlushStatus, LocalContributionQueue, NormalizeError, NormalizerConfig,
};
use tuss_standards::{FileDictionarySource, InMemoryDictionarySource};

fn records() -> Vec<ExamRecord> {
    vec![
        ExamRecord::new("40301018", "Ressonância magnética de crânio", "Imagem")
            .with_aliases(["RM CRANIO", "RNM CRANIO"]),
        ExamRecord::new("40901114", "Ultrassonografia de abdome total", "Imagem")
            .with_aliases(["USG ABDOME TOTAL", "US ABDOME TOTAL"])
            .with_friendly_name("Ultrassom de abdome"),
        ExamRecord::new("40304361", "Hemograma completo", "Laboratório")
            .with_aliases(["HMG COMPLETO", "HEMOGRAMA"]),
        ExamRecord::new("40805018", "Radiografia de tórax (PA e perfil)", "Imagem")
            .with_aliases(["RX TORAX PA"]),
    ]
}

fn engine_with(dir: &TempDir, records: &[ExamRecord], config: NormalizerConfig) -> ExamNormalizer {
    let source = InMemoryDictionarySource::new(DictionaryBlob::from_records(records));
    ExamNormalizer::new(
        &source,
        config.with_cache_path(dir.path().join("mapping_cache.json")),
    )
    .expect("engine")
}

fn engine(dir: &TempDir) -> ExamNormalizer {
    engine_with(dir, &records(), NormalizerConfig::default())
}

#[test]
fn alias_matches_exactly() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);

    let result = engine.normalize_one("rm cranio");
    assert_eq!(result.confidence, Confidence::Exact);
    assert_eq!(result.score, 100.0);
    assert_eq!(result.code.as_deref(), Some("40301018"));
    assert_eq!(
        result.canonical_name.as_deref(),
        Some("Ressonância magnética de crânio")
    );
    assert_eq!(result.category.as_deref(), Some("Imagem"));
    assert!(!result.cache_hit);
    assert!(!result.needs_external_resolution);
    assert_eq!(result.original_name, "rm cranio");
}

#[test]
fn abbreviation_matches_fuzzily() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);

    let result = engine.normalize_one("USG ABD TOTAL");
    assert_eq!(result.confidence, Confidence::Fuzzy);
    assert!(result.score >= 75.0, "score {}", result.score);
    assert_eq!(result.code.as_deref(), Some("40901114"));
    assert_eq!(result.friendly_name.as_deref(), Some("Ultrassom de abdome"));
    assert!(!result.needs_external_resolution);
    assert_eq!(engine.session_stats().fuzzy, 1);
}

#[test]
fn low_fuzzy_score_requests_external_resolution() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_with(
        &dir,
        &records(),
        NormalizerConfig::default().with_llm_threshold(95.0),
    );

    let result = engine.normalize_one("USG ABD TOTAL");
    assert_eq!(result.confidence, Confidence::Fuzzy);
    assert!(result.needs_external_resolution);
    assert_eq!(engine.session_stats().llm_needed, 1);

    let again = engine.normalize_one("USG ABD TOTAL");
    assert!(again.cache_hit);
    assert!(again.needs_external_resolution);
}

#[test]
fn unknown_name_is_no_match() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);

    let result = engine.normalize_one("XYZPLACEHOLDER123");
    assert_eq!(result.confidence, Confidence::NoMatch);
    assert_eq!(result.score, 0.0);
    assert!(result.canonical_name.is_none());
    assert!(result.code.is_none());
    assert!(result.needs_external_resolution);

    let stats = engine.session_stats();
    assert_eq!(stats.no_match, 1);
    assert_eq!(stats.llm_needed, 1);
}

#[test]
fn cached_no_match_is_served_without_a_name() {
    let dir = TempDir::new().unwrap();
    {
        let mut engine = engine(&dir);
        engine.normalize_one("XYZPLACEHOLDER123");
        engine.save().unwrap();
    }

    let mut engine = engine(&dir);
    let result = engine.normalize_one("xyzplaceholder123");
    assert!(result.cache_hit);
    assert_eq!(result.confidence, Confidence::NoMatch);
    assert!(result.canonical_name.is_none());
    assert!(result.needs_external_resolution);
    assert_eq!(engine.session_stats().cache_hits, 1);
}

#[test]
fn empty_name_is_no_match_and_not_cached() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);

    let result = engine.normalize_one("  ...  ");
    assert_eq!(result.confidence, Confidence::NoMatch);
    assert!(engine.cache().is_empty());
}

#[test]
fn external_result_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);

    engine.normalize_one("XYZPLACEHOLDER123");
    engine
        .apply_external_result("XYZPLACEHOLDER123", "Exame Desconhecido X", None, "portal-a")
        .unwrap();

    let result = engine.normalize_one("XYZPLACEHOLDER123");
    assert_eq!(result.confidence, Confidence::Llm);
    assert_eq!(result.score, 90.0);
    assert!(result.cache_hit);
    assert!(!result.needs_external_resolution);
    assert_eq!(result.canonical_name.as_deref(), Some("Exame Desconhecido X"));
    assert!(result.category.is_none());
    assert!(dir.path().join("mapping_cache.json").exists());
}

#[test]
fn external_result_rejects_empty_name() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    let error = engine
        .apply_external_result("!!!", "Algo", None, "portal")
        .unwrap_err();
    assert!(matches!(error, NormalizeError::EmptyName(_)));
}

#[test]
fn repeated_lookups_hit_the_cache() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);

    for name in ["hmg completo", "USG ABD TOTAL", "XYZPLACEHOLDER123"] {
        let first = engine.normalize_one(name);
        let second = engine.normalize_one(name);
        assert!(!first.cache_hit, "{name}");
        assert!(second.cache_hit, "{name}");
        assert_eq!(first.canonical_name, second.canonical_name);
        assert_eq!(first.code, second.code);
        assert_eq!(first.confidence, second.confidence);
        assert_eq!(first.friendly_name, second.friendly_name);
    }

    let stats = engine.session_stats();
    assert_eq!(stats.total, 6);
    assert_eq!(stats.cache_hits, 3);
    assert_eq!(stats.exact, 1);
    assert_eq!(stats.fuzzy, 1);
    assert_eq!(stats.no_match, 1);
}

#[test]
fn every_canonical_name_matches_its_record() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);

    for record in records() {
        let result = engine.normalize_one(&record.canonical_name);
        assert_eq!(result.confidence, Confidence::Exact, "{}", record.code);
        assert_eq!(result.code.as_deref(), Some(record.code.as_str()));
    }
}

#[test]
fn cache_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let mut engine = engine(&dir);
        engine.normalize_one("hemograma");
        engine.save().unwrap();
    }

    let mut engine = engine(&dir);
    let result = engine.normalize_one("HEMOGRAMA");
    assert!(result.cache_hit);
    assert_eq!(result.confidence, Confidence::Exact);
    assert_eq!(result.code.as_deref(), Some("40304361"));
    assert_eq!(engine.cache().peek(&tuss_map::canon("hemograma")).unwrap().use_count, 2);
}

#[test]
fn dictionary_update_invalidates_computed_entries() {
    let dir = TempDir::new().unwrap();
    {
        let mut engine = engine(&dir);
        assert_eq!(engine.normalize_one("RX TORAX").confidence, Confidence::NoMatch);
        engine
            .apply_external_result("ECG REPOUSO", "Eletrocardiograma em repouso", None, "portal")
            .unwrap();
        engine.save().unwrap();
    }

    let mut updated = records();
    updated[3].aliases.push("RX TORAX".to_string());
    let mut engine = engine_with(&dir, &updated, NormalizerConfig::default());

    let result = engine.normalize_one("RX TORAX");
    assert!(!result.cache_hit);
    assert_eq!(result.confidence, Confidence::Exact);
    assert_eq!(result.code.as_deref(), Some("40805018"));

    let resolved = engine.normalize_one("ecg repouso");
    assert!(resolved.cache_hit);
    assert_eq!(resolved.confidence, Confidence::Llm);
}

#[test]
fn batch_merges_results_and_saves_once() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);

    let mut batch: Vec<Map<String, Value>> = [
        json!({"nome": "HMG COMPLETO", "medico": "Dra. Silva", "data": "2024-05-01"}),
        json!({"nome_original": "XYZPLACEHOLDER123"}),
        json!({"nome": "USG ABD TOTAL"}),
    ]
    .into_iter()
    .filter_map(|value| value.as_object().cloned())
    .collect();

    engine.normalize_batch(&mut batch).unwrap();

    assert_eq!(batch[0]["medico"], "Dra. Silva");
    assert_eq!(batch[0]["nome_original"], "HMG COMPLETO");
    assert_eq!(batch[0]["nome_padrao"], "Hemograma completo");
    assert_eq!(batch[0]["codigo_tuss"], "40304361");
    assert_eq!(batch[0]["confidence"], "exact");
    assert_eq!(batch[0]["score"], 100.0);
    assert_eq!(batch[0]["_cache_hit"], false);
    assert_eq!(batch[0]["_needs_llm"], false);

    assert_eq!(batch[1]["nome_padrao"], "XYZPLACEHOLDER123");
    assert_eq!(batch[1]["confidence"], "no_match");
    assert_eq!(batch[1]["codigo_tuss"], Value::Null);
    assert_eq!(batch[1]["_needs_llm"], true);

    assert_eq!(batch[2]["confidence"], "fuzzy");
    assert_eq!(batch[2]["nome_comum"], "Ultrassom de abdome");

    let saved: Value = serde_json::from_slice(
        &std::fs::read(dir.path().join("mapping_cache.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(saved["metadata"]["total_entries"], 3);
}

#[test]
fn contributions_are_queued_and_flushed() {
    let dir = TempDir::new().unwrap();
    let contrib_path = dir.path().join("contrib/pending.json");
    let mut engine =
        engine(&dir).with_contributions(LocalContributionQueue::new(&contrib_path));

    engine
        .apply_external_result("XYZ", "Exame X", Some("99999999"), "portal-a")
        .unwrap();
    assert_eq!(engine.pending_contributions().len(), 1);
    assert_eq!(engine.pending_contributions()[0].portal, "portal-a");
    assert_eq!(engine.pending_contributions()[0].codigo_tuss, "99999999");

    let report = engine.flush_contributions();
    assert_eq!(report.status, FlushStatus::Success);
    assert_eq!(report.submitted, 1);
    assert!(contrib_path.exists());
    assert_eq!(engine.flush_contributions().status, FlushStatus::Skipped);
}

#[test]
fn flush_without_queue_is_disabled() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    assert_eq!(engine.flush_contributions().status, FlushStatus::Disabled);
    assert!(engine.pending_contributions().is_empty());
}

#[test]
fn report_combines_session_and_cache() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    engine.normalize_one("rm cranio");
    engine.normalize_one("rm cranio");

    let report = engine.report();
    assert_eq!(report.session.total, 2);
    assert_eq!(report.session.cache_hits, 1);
    assert_eq!(report.cache.total_entries, 1);
    assert_eq!(report.cache.exact_matches, 1);
    assert_eq!(report.rows()[0], ("Exams normalized", 2));
}

#[test]
fn prompt_uses_configured_threshold() {
    let dir = TempDir::new().unwrap();
    let engine = engine_with(
        &dir,
        &records(),
        NormalizerConfig::default().with_llm_threshold(85.0),
    );
    let prompt = engine.resolution_prompt("HMG COMPL", 72.0);
    assert!(prompt.contains("72.0%"));
    assert!(prompt.contains("threshold de 85%"));
}

#[test]
fn construction_errors() {
    let dir = TempDir::new().unwrap();
    let source = InMemoryDictionarySource::new(DictionaryBlob::from_records(&records()));
    let config = NormalizerConfig::default()
        .with_fuzzy_threshold(150.0)
        .with_cache_path(dir.path().join("c.json"));
    assert!(matches!(
        ExamNormalizer::new(&source, config),
        Err(NormalizeError::InvalidConfig(_))
    ));

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{"_meta": {}}"#).unwrap();
    let result = ExamNormalizer::new(
        &FileDictionarySource::new(&bad),
        NormalizerConfig::default().with_cache_path(dir.path().join("c.json")),
    );
    assert!(matches!(result, Err(NormalizeError::Dictionary(_))));
}

/// Engine whose cache path is an occupied directory, so every save fails.
fn engine_with_unwritable_cache(dir: &TempDir) -> ExamNormalizer {
    let blocked = dir.path().join("blocked");
    std::fs::create_dir_all(&blocked).unwrap();
    std::fs::write(blocked.join("keep"), "x").unwrap();
    let source = InMemoryDictionarySource::new(DictionaryBlob::from_records(&records()));
    ExamNormalizer::new(&source, NormalizerConfig::default().with_cache_path(&blocked))
        .expect("engine")
}

#[test]
fn batch_merges_results_even_when_save_fails() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_with_unwritable_cache(&dir);

    let mut batch: Vec<Map<String, Value>> = [
        json!({"nome": "HMG COMPLETO", "id": 1}),
        json!({"nome": "xyz desconhecido 123"}),
        json!({"nome_original": "rm cranio"}),
    ]
    .into_iter()
    .map(|value| value.as_object().unwrap().clone())
    .collect();

    let outcome = engine.normalize_batch(&mut batch);
    assert!(matches!(outcome, Err(NormalizeError::Cache(_))), "{outcome:?}");

    for record in &batch {
        assert!(record.contains_key("confidence"), "{record:?}");
        assert!(record.contains_key("codigo_tuss"), "{record:?}");
        assert!(record.contains_key("_needs_llm"), "{record:?}");
    }
    assert_eq!(batch[0]["codigo_tuss"], "40304361");
    assert_eq!(batch[0]["id"], 1);
    assert_eq!(batch[1]["confidence"], "no_match");
    assert_eq!(batch[1]["_needs_llm"], true);
    assert_eq!(batch[2]["codigo_tuss"], "40301018");
}

#[test]
fn external_result_is_queued_when_save_fails() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_with_unwritable_cache(&dir)
        .with_contributions(LocalContributionQueue::new(dir.path().join("pending.json")));

    let outcome =
        engine.apply_external_result("EXAME RARO Q", "Exame raro Q", Some("99999999"), "lab-a");
    assert!(matches!(outcome, Err(NormalizeError::Cache(_))), "{outcome:?}");

    let pending = engine.pending_contributions();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].original_name, "EXAME RARO Q");
    assert_eq!(pending[0].codigo_tuss, "99999999");

    let cached = engine.normalize_one("exame raro q");
    assert_eq!(cached.confidence, Confidence::Llm);
    assert!(cached.cache_hit);
}
