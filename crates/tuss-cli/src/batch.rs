//! JSON batch files: an array of records in, the same array enriched out.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

/// Path meaning stdin or stdout.
pub const STDIO_PATH: &str = "-";

/// Read a batch file.
///
/// Each element is either an object carrying `nome` (or `nome_original`)
/// or a bare string, which becomes `{"nome": <string>}`.
pub fn read_records(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let text = if path.as_os_str() == STDIO_PATH {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("read batch from stdin")?;
        text
    } else {
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
    };
    parse_records(&text).with_context(|| format!("parse {}", path.display()))
}

/// Parse batch JSON text.
pub fn parse_records(text: &str) -> Result<Vec<Map<String, Value>>> {
    let document: Value = serde_json::from_str(text).context("invalid JSON")?;
    let Value::Array(items) = document else {
        bail!("expected a JSON array of exams");
    };
    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| match item {
            Value::Object(record) => Ok(record),
            Value::String(name) => {
                let mut record = Map::new();
                record.insert("nome".to_string(), Value::String(name));
                Ok(record)
            }
            other => bail!("item {position}: expected an object or a string, got {other}"),
        })
        .collect()
}

/// Write records as pretty JSON to `path`, or stdout when `path` is `None` or `-`.
pub fn write_records(records: &[Map<String, Value>], path: Option<&Path>) -> Result<()> {
    let mut text = serde_json::to_string_pretty(records).context("serialize batch")?;
    text.push('\n');
    match path {
        Some(path) if path.as_os_str() != STDIO_PATH => {
            fs::write(path, text).with_context(|| format!("write {}", path.display()))
        }
        _ => io::stdout()
            .lock()
            .write_all(text.as_bytes())
            .context("write batch to stdout"),
    }
}
