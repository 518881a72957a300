//! Structural and data-quality checks for dictionary documents.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tuss_map::canon;
use tuss_model::DictionaryBlob;

use crate::error::{Result, StandardsError};

const REQUIRED_FIELDS: [&str; 4] = ["codigo_tuss", "nome_padrao", "categoria", "aliases"];

/// A TUSS code used by more than one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateCode {
    pub code: String,
    pub first_entry: usize,
    pub duplicate_entry: usize,
}

/// Outcome of validating a dictionary document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Structural errors. A non-empty list makes the document invalid.
    pub errors: Vec<String>,
    pub total_entries: usize,
    pub entries_without_aliases: usize,
    pub duplicate_codes: Vec<DuplicateCode>,
    /// Canonical keys claimed by more than one entry, with the entry positions.
    pub duplicate_aliases: BTreeMap<String, Vec<usize>>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Read and validate a dictionary file.
///
/// I/O failures are returned as errors; JSON and structural problems are
/// reported in the [`ValidationReport`].
pub fn validate_file(path: &Path) -> Result<ValidationReport> {
    let bytes = std::fs::read(path).map_err(|e| StandardsError::io(path, e))?;
    Ok(match serde_json::from_slice::<Value>(&bytes) {
        Ok(document) => validate_document(&document),
        Err(error) => ValidationReport {
            errors: vec![format!("invalid JSON: {error}")],
            ..ValidationReport::default()
        },
    })
}

/// Validate a raw JSON document, including its top-level shape.
pub fn validate_document(document: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();
    if document.get("_meta").is_none() {
        report.errors.push("missing '_meta' object".to_string());
        return report;
    }
    match document.get("exames") {
        None => report.errors.push("missing 'exames' field".to_string()),
        Some(Value::Array(entries)) => check_entries(entries, &mut report),
        Some(_) => report.errors.push("'exames' must be an array".to_string()),
    }
    report
}

/// Validate the entries of an already parsed blob.
pub fn validate_blob(blob: &DictionaryBlob) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_entries(&blob.exams, &mut report);
    report
}

fn check_entries(entries: &[Value], report: &mut ValidationReport) {
    report.total_entries = entries.len();

    let mut seen_codes: HashMap<&str, usize> = HashMap::new();
    let mut claims: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();

    for (position, entry) in entries.iter().enumerate() {
        let Some(object) = entry.as_object() else {
            report
                .errors
                .push(format!("entry {position}: not a JSON object"));
            continue;
        };

        for field in REQUIRED_FIELDS {
            if !object.contains_key(field) {
                report
                    .errors
                    .push(format!("entry {position}: missing required field '{field}'"));
            }
        }

        let Some(code) = non_empty_str(object.get("codigo_tuss")) else {
            report
                .errors
                .push(format!("entry {position}: codigo_tuss must be a non-empty string"));
            continue;
        };
        match seen_codes.get(code) {
            Some(&first_entry) => report.duplicate_codes.push(DuplicateCode {
                code: code.to_string(),
                first_entry,
                duplicate_entry: position,
            }),
            None => {
                seen_codes.insert(code, position);
            }
        }

        match non_empty_str(object.get("nome_padrao")) {
            Some(name) => claim(&mut claims, name, position),
            None => report
                .errors
                .push(format!("entry {position}: nome_padrao must be a non-empty string")),
        }
        if non_empty_str(object.get("categoria")).is_none() {
            report
                .errors
                .push(format!("entry {position}: categoria must be a non-empty string"));
        }

        let aliases = match object.get("aliases") {
            Some(Value::Array(aliases)) => aliases,
            Some(_) => {
                report
                    .errors
                    .push(format!("entry {position}: aliases must be an array"));
                continue;
            }
            None => continue,
        };
        if aliases.is_empty() {
            report.entries_without_aliases += 1;
        }
        for alias in aliases {
            match alias.as_str() {
                Some(alias) => claim(&mut claims, alias, position),
                None => report
                    .errors
                    .push(format!("entry {position}: alias must be a string, found {alias}")),
            }
        }
    }

    report.duplicate_aliases = claims
        .into_iter()
        .filter(|(_, owners)| owners.len() > 1)
        .map(|(key, owners)| (key, owners.into_iter().collect()))
        .collect();
}

fn claim(claims: &mut BTreeMap<String, BTreeSet<usize>>, name: &str, position: usize) {
    let key = canon(name);
    if !key.is_empty() {
        claims.entry(key.into_string()).or_default().insert(position);
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}
