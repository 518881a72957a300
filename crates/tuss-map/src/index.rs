//! Alias index over a loaded dictionary.
//!
//! Every record contributes its canonical name and each alias, keyed by
//! [`CanonicalKey`]. When two different records produce the same key, the
//! record processed last owns the key; each such collision is kept on the
//! index so validation tooling can report it.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, warn};
use tuss_model::{Candidate, ExamRecord};

use crate::canonical::{CanonicalKey, canon};
use crate::score::{MAX_SCORE, similarity};

/// Default number of fuzzy candidates returned by a scan.
pub const DEFAULT_TOP_N: usize = 3;

/// Two records normalizing to the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasCollision {
    /// The contested canonical key.
    pub key: CanonicalKey,
    /// Code of the record that previously owned the key.
    pub replaced_code: String,
    /// Code of the record that now owns the key.
    pub winning_code: String,
}

/// Result of matching one canonical key against the index.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome<'a> {
    /// The key is indexed.
    Exact { record: &'a ExamRecord },
    /// Best fuzzy candidate, with the runners-up in score order.
    Fuzzy {
        record: &'a ExamRecord,
        score: f64,
        alternatives: Vec<Candidate>,
    },
    /// Nothing reached the threshold.
    NoMatch,
}

impl MatchOutcome<'_> {
    /// Score of the outcome: 100 for exact, candidate score for fuzzy, 0 otherwise.
    pub fn score(&self) -> f64 {
        match self {
            Self::Exact { .. } => MAX_SCORE,
            Self::Fuzzy { score, .. } => *score,
            Self::NoMatch => 0.0,
        }
    }
}

/// Immutable lookup structure built once per dictionary.
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    records: Vec<ExamRecord>,
    keys: HashMap<CanonicalKey, usize>,
    by_code: HashMap<String, usize>,
    collisions: Vec<AliasCollision>,
}

impl AliasIndex {
    /// Index every record's canonical name and aliases.
    ///
    /// Names that canonicalize to an empty key are not indexed.
    pub fn build(records: Vec<ExamRecord>) -> Self {
        let mut index = Self {
            keys: HashMap::with_capacity(records.len() * 4),
            by_code: HashMap::with_capacity(records.len()),
            collisions: Vec::new(),
            records,
        };

        for position in 0..index.records.len() {
            let record = &index.records[position];
            index.by_code.insert(record.code.clone(), position);

            let names: Vec<CanonicalKey> = std::iter::once(&record.canonical_name)
                .chain(record.aliases.iter())
                .map(|name| canon(name))
                .filter(|key| !key.is_empty())
                .collect();

            for key in names {
                index.insert_key(key, position);
            }
        }

        debug!(
            records = index.records.len(),
            keys = index.keys.len(),
            collisions = index.collisions.len(),
            "alias index built"
        );
        index
    }

    fn insert_key(&mut self, key: CanonicalKey, position: usize) {
        let Some(previous) = self.keys.insert(key.clone(), position) else {
            return;
        };
        if previous == position {
            return;
        }
        let replaced_code = self.records[previous].code.clone();
        let winning_code = self.records[position].code.clone();
        if replaced_code == winning_code {
            return;
        }
        warn!(
            key = %key,
            replaced = %replaced_code,
            winner = %winning_code,
            "alias shared by two exams, last one wins"
        );
        self.collisions.push(AliasCollision {
            key,
            replaced_code,
            winning_code,
        });
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are indexed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct indexed keys.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Records in load order.
    pub fn records(&self) -> &[ExamRecord] {
        &self.records
    }

    /// Alias collisions observed while building.
    pub fn collisions(&self) -> &[AliasCollision] {
        &self.collisions
    }

    /// Look up a record by TUSS code.
    pub fn record_by_code(&self, code: &str) -> Option<&ExamRecord> {
        self.by_code.get(code).map(|&position| &self.records[position])
    }

    /// Exact lookup of a canonical key.
    pub fn exact_lookup(&self, key: &CanonicalKey) -> Option<&ExamRecord> {
        self.keys.get(key).map(|&position| &self.records[position])
    }

    /// Score `key` against every indexed key.
    ///
    /// Keeps the best score per record code, drops candidates below
    /// `threshold`, and returns at most `top_n` sorted by score descending
    /// then code ascending.
    pub fn fuzzy_scan(&self, key: &CanonicalKey, threshold: f64, top_n: usize) -> Vec<Candidate> {
        if key.is_empty() || top_n == 0 {
            return Vec::new();
        }

        let mut best: HashMap<&str, (f64, &CanonicalKey)> = HashMap::new();
        for (alias_key, &position) in &self.keys {
            let code = self.records[position].code.as_str();
            let score = similarity(key, alias_key);
            best.entry(code)
                .and_modify(|current| {
                    if score > current.0 || (score == current.0 && alias_key < current.1) {
                        *current = (score, alias_key);
                    }
                })
                .or_insert((score, alias_key));
        }

        let mut candidates: Vec<Candidate> = best
            .into_iter()
            .filter(|(_, (score, _))| *score >= threshold)
            .filter_map(|(code, (score, alias_key))| {
                let record = self.record_by_code(code)?;
                Some(Candidate {
                    code: record.code.clone(),
                    canonical_name: record.canonical_name.clone(),
                    category: record.category.clone(),
                    score,
                    matched_alias_key: alias_key.as_str().to_string(),
                })
            })
            .collect();

        candidates.sort_by(compare_candidates);
        candidates.truncate(top_n);
        candidates
    }

    /// Exact lookup, then fuzzy scan.
    pub fn match_key(&self, key: &CanonicalKey, threshold: f64, top_n: usize) -> MatchOutcome<'_> {
        if key.is_empty() {
            return MatchOutcome::NoMatch;
        }
        if let Some(record) = self.exact_lookup(key) {
            return MatchOutcome::Exact { record };
        }

        let mut candidates = self.fuzzy_scan(key, threshold, top_n).into_iter();
        let Some(best) = candidates.next() else {
            return MatchOutcome::NoMatch;
        };
        match self.record_by_code(&best.code) {
            Some(record) => MatchOutcome::Fuzzy {
                record,
                score: best.score,
                alternatives: candidates.collect(),
            },
            None => MatchOutcome::NoMatch,
        }
    }
}

fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.code.cmp(&b.code))
}
