//! The matching pipeline.
//!
//! For every name: canonicalize, serve from the mapping cache when the
//! entry is still current, otherwise try an exact alias lookup, then a
//! fuzzy scan, classify the outcome and write it back to the cache.

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};
use tuss_map::{AliasIndex, CanonicalKey, MAX_SCORE, MatchOutcome, canon};
use tuss_model::{Confidence, ExamRecord, NormalizationResult, SessionStats};
use tuss_persistence::{CacheEntry, CacheUpdate, MappingCache};
use tuss_standards::{Dictionary, DictionarySource};

use crate::config::NormalizerConfig;
use crate::contrib::{ContributionEntry, ContributionQueue, FlushReport};
use crate::error::{NormalizeError, Result};
use crate::prompt::resolution_prompt;
use crate::report::SessionReport;

/// Conventional score recorded for externally resolved names.
pub const EXTERNAL_RESOLUTION_SCORE: f64 = 90.0;

/// Normalizes free-text exam names against one dictionary.
///
/// Owns its alias index and mapping cache. Not meant to share a cache file
/// with another live engine.
pub struct ExamNormalizer {
    index: AliasIndex,
    dictionary_version: String,
    cache: MappingCache,
    config: NormalizerConfig,
    stats: SessionStats,
    contributions: Option<Box<dyn ContributionQueue>>,
}

impl ExamNormalizer {
    /// Load the dictionary from `source` and the cache from `config.cache_path`.
    pub fn new(source: &dyn DictionarySource, config: NormalizerConfig) -> Result<Self> {
        config.validate()?;
        let dictionary = Dictionary::load(source)?;
        let cache = MappingCache::load(&config.cache_path);
        Ok(Self::from_parts(dictionary, cache, config))
    }

    /// Assemble an engine from an already loaded dictionary and cache.
    pub fn from_parts(dictionary: Dictionary, cache: MappingCache, config: NormalizerConfig) -> Self {
        let index = AliasIndex::build(dictionary.records);
        info!(
            records = index.len(),
            keys = index.key_count(),
            cached = cache.len(),
            "normalizer ready"
        );
        Self {
            index,
            dictionary_version: dictionary.version,
            cache,
            config,
            stats: SessionStats::default(),
            contributions: None,
        }
    }

    /// Queue externally resolved names for contribution.
    #[must_use]
    pub fn with_contributions(mut self, queue: impl ContributionQueue + 'static) -> Self {
        self.contributions = Some(Box::new(queue));
        self
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn index(&self) -> &AliasIndex {
        &self.index
    }

    pub fn cache(&self) -> &MappingCache {
        &self.cache
    }

    pub fn dictionary_version(&self) -> &str {
        &self.dictionary_version
    }

    /// Contributions waiting for [`flush_contributions`](Self::flush_contributions).
    pub fn pending_contributions(&self) -> &[ContributionEntry] {
        self.contributions
            .as_deref()
            .map(ContributionQueue::pending)
            .unwrap_or_default()
    }

    /// Normalize one name. Unmatched input is a normal `no_match` result.
    pub fn normalize_one(&mut self, name: &str) -> NormalizationResult {
        let key = canon(name);

        if let Some(result) = self.from_cache(name, &key) {
            self.stats.record_cache_hit();
            debug!(confidence = %result.confidence, "served from cache");
            return result;
        }

        let result = self.compute(name, &key);
        self.stats
            .record_outcome(result.confidence, result.needs_external_resolution);
        debug!(
            confidence = %result.confidence,
            score = result.score,
            code = result.code.as_deref().unwrap_or(""),
            needs_external = result.needs_external_resolution,
            "normalized"
        );

        if !key.is_empty() {
            self.cache.put(
                key,
                CacheUpdate {
                    canonical_name: result.canonical_name.clone(),
                    code: result.code.clone(),
                    category: result.category.clone(),
                    confidence: result.confidence,
                    score: result.score,
                    dictionary_version: Some(self.dictionary_version.clone()),
                },
            );
        }
        result
    }

    /// Normalize every record in place, then save the cache once.
    ///
    /// The name is read from `nome`, falling back to `nome_original`.
    /// Caller fields are kept; result fields are added or overwritten. When
    /// the final save fails the records already carry their results.
    pub fn normalize_batch(&mut self, records: &mut [Map<String, Value>]) -> Result<()> {
        for record in records.iter_mut() {
            let name = record
                .get("nome")
                .or_else(|| record.get("nome_original"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let result = self.normalize_one(&name);
            merge_result(record, &name, result);
        }
        self.save()
    }

    /// Record a name resolved outside the engine.
    ///
    /// Writes an `llm` cache entry scored [`EXTERNAL_RESOLUTION_SCORE`],
    /// queues a contribution when a queue is configured, then saves the
    /// cache. The contribution stays queued even if the save fails.
    pub fn apply_external_result(
        &mut self,
        original_name: &str,
        resolved_name: &str,
        code: Option<&str>,
        source_tag: &str,
    ) -> Result<()> {
        let key = canon(original_name);
        if key.is_empty() {
            return Err(NormalizeError::EmptyName(original_name.to_string()));
        }

        self.cache.put(
            key,
            CacheUpdate {
                canonical_name: Some(resolved_name.to_string()),
                code: code.map(str::to_string),
                category: None,
                confidence: Confidence::Llm,
                score: EXTERNAL_RESOLUTION_SCORE,
                dictionary_version: None,
            },
        );

        if let Some(queue) = self.contributions.as_deref_mut() {
            queue.enqueue(ContributionEntry {
                original_name: original_name.to_string(),
                mapped_name: resolved_name.to_string(),
                codigo_tuss: code.unwrap_or_default().to_string(),
                confidence: Confidence::Llm,
                score: EXTERNAL_RESOLUTION_SCORE,
                portal: source_tag.to_string(),
                timestamp: Utc::now(),
            });
        }
        self.save()
    }

    /// Flush queued contributions; `Disabled` when no queue is configured.
    pub fn flush_contributions(&mut self) -> FlushReport {
        match self.contributions.as_deref_mut() {
            Some(queue) => queue.flush(),
            None => FlushReport::disabled(),
        }
    }

    /// Persist the mapping cache.
    pub fn save(&mut self) -> Result<()> {
        self.cache.save()?;
        Ok(())
    }

    pub fn session_stats(&self) -> SessionStats {
        self.stats
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            session: self.stats,
            cache: self.cache.stats(),
        }
    }

    /// Prompt for resolving `original_name` externally.
    pub fn resolution_prompt(&self, original_name: &str, score: f64) -> String {
        resolution_prompt(original_name, score, self.config.llm_threshold)
    }

    fn from_cache(&mut self, name: &str, key: &CanonicalKey) -> Option<NormalizationResult> {
        let servable = self
            .cache
            .peek(key)
            .is_some_and(|entry| self.is_servable(entry));
        if !servable {
            return None;
        }

        let entry = self.cache.get(key)?.clone();
        let friendly_name = match entry.confidence {
            Confidence::Exact | Confidence::Fuzzy => entry
                .code
                .as_deref()
                .and_then(|code| self.index.record_by_code(code))
                .map(|record| record.display_name().to_string()),
            Confidence::Llm | Confidence::NoMatch => None,
        };
        let needs_external_resolution = self.needs_external(entry.confidence, entry.score);

        Some(NormalizationResult {
            original_name: name.to_string(),
            canonical_name: entry.canonical_name,
            friendly_name,
            code: entry.code,
            category: entry.category,
            confidence: entry.confidence,
            score: entry.score,
            alternatives: Vec::new(),
            cache_hit: true,
            needs_external_resolution,
        })
    }

    /// Current entries are served when they carry a name, and `no_match`
    /// entries are served too, so unknown names skip rescoring until the
    /// dictionary version changes.
    fn is_servable(&self, entry: &CacheEntry) -> bool {
        if !entry.is_current(&self.dictionary_version) {
            return false;
        }
        entry.canonical_name.is_some() || entry.confidence == Confidence::NoMatch
    }

    fn compute(&self, name: &str, key: &CanonicalKey) -> NormalizationResult {
        match self
            .index
            .match_key(key, self.config.fuzzy_threshold, self.config.top_n)
        {
            MatchOutcome::Exact { record } => matched(name, record, Confidence::Exact, MAX_SCORE),
            MatchOutcome::Fuzzy {
                record,
                score,
                alternatives,
            } => NormalizationResult {
                alternatives,
                needs_external_resolution: self.needs_external(Confidence::Fuzzy, score),
                ..matched(name, record, Confidence::Fuzzy, score)
            },
            MatchOutcome::NoMatch => NormalizationResult::no_match(name),
        }
    }

    fn needs_external(&self, confidence: Confidence, score: f64) -> bool {
        match confidence {
            Confidence::NoMatch => true,
            Confidence::Fuzzy => score < self.config.llm_threshold,
            Confidence::Exact | Confidence::Llm => false,
        }
    }
}

fn matched(name: &str, record: &ExamRecord, confidence: Confidence, score: f64) -> NormalizationResult {
    NormalizationResult {
        original_name: name.to_string(),
        canonical_name: Some(record.canonical_name.clone()),
        friendly_name: Some(record.display_name().to_string()),
        code: Some(record.code.clone()),
        category: Some(record.category.clone()),
        confidence,
        score,
        alternatives: Vec::new(),
        cache_hit: false,
        needs_external_resolution: false,
    }
}

fn merge_result(record: &mut Map<String, Value>, name: &str, result: NormalizationResult) {
    let canonical = result.canonical_name.unwrap_or_else(|| name.to_string());
    record.insert("nome_original".into(), Value::from(name));
    record.insert("nome_padrao".into(), Value::from(canonical));
    if let Some(friendly) = result.friendly_name {
        record.insert("nome_comum".into(), Value::from(friendly));
    }
    record.insert("confidence".into(), Value::from(result.confidence.as_str()));
    record.insert("score".into(), Value::from(result.score));
    record.insert("codigo_tuss".into(), Value::from(result.code));
    record.insert("categoria".into(), Value::from(result.category));
    record.insert("_cache_hit".into(), Value::from(result.cache_hit));
    record.insert(
        "_needs_llm".into(),
        Value::from(result.needs_external_resolution),
    );
}
