//! Queue of externally resolved names awaiting contribution to the shared
//! dictionary.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tuss_model::Confidence;

use crate::error::{NormalizeError, Result};

/// Default location of the local contribution file.
pub const DEFAULT_CONTRIB_FILE: &str = "contrib/pending.json";

/// One resolved mapping proposed for inclusion in the dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionEntry {
    pub original_name: String,
    pub mapped_name: String,
    /// Empty when the resolver did not supply a code.
    pub codigo_tuss: String,
    pub confidence: Confidence,
    pub score: f64,
    /// Intake system the name came from.
    pub portal: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushStatus {
    Success,
    Skipped,
    Error,
    /// No queue is configured.
    Disabled,
}

/// Result of flushing a contribution queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlushReport {
    pub status: FlushStatus,
    pub submitted: usize,
    pub message: String,
    /// Where the contributions went (file path, pull request URL...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl FlushReport {
    pub fn disabled() -> Self {
        Self {
            status: FlushStatus::Disabled,
            submitted: 0,
            message: "contributions disabled".to_string(),
            location: None,
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: FlushStatus::Skipped,
            submitted: 0,
            message: message.into(),
            location: None,
        }
    }
}

/// Destination for resolved mappings.
pub trait ContributionQueue {
    fn enqueue(&mut self, entry: ContributionEntry);

    /// Entries queued since the last successful flush.
    fn pending(&self) -> &[ContributionEntry];

    /// Submit pending entries. Entries stay queued unless the flush succeeds.
    fn flush(&mut self) -> FlushReport;
}

/// Appends contributions to a JSON array file on disk.
#[derive(Debug, Clone)]
pub struct LocalContributionQueue {
    path: PathBuf,
    queue: Vec<ContributionEntry>,
}

impl LocalContributionQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            queue: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&self) -> Result<usize> {
        let mut all = read_entries(&self.path)?;
        all.extend(self.queue.iter().cloned());

        let io_error = |source: std::io::Error| NormalizeError::Contribution {
            path: self.path.clone(),
            source,
        };
        let bytes = serde_json::to_vec_pretty(&all)
            .map_err(|e| io_error(std::io::Error::other(e)))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let mut temp_name = self.path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);

        let mut file = fs::File::create(&temp_path).map_err(io_error)?;
        file.write_all(&bytes).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
        fs::rename(&temp_path, &self.path).map_err(io_error)?;
        Ok(all.len())
    }
}

impl ContributionQueue for LocalContributionQueue {
    fn enqueue(&mut self, entry: ContributionEntry) {
        self.queue.push(entry);
    }

    fn pending(&self) -> &[ContributionEntry] {
        &self.queue
    }

    fn flush(&mut self) -> FlushReport {
        if self.queue.is_empty() {
            return FlushReport::skipped("no contributions queued");
        }

        match self.write_all() {
            Ok(total) => {
                let submitted = self.queue.len();
                self.queue.clear();
                info!(submitted, total, path = %self.path.display(), "contributions written");
                FlushReport {
                    status: FlushStatus::Success,
                    submitted,
                    message: format!("wrote {submitted} contributions ({total} in file)"),
                    location: Some(self.path.display().to_string()),
                }
            }
            Err(error) => {
                warn!(%error, "failed to flush contributions");
                FlushReport {
                    status: FlushStatus::Error,
                    submitted: 0,
                    message: error.to_string(),
                    location: None,
                }
            }
        }
    }
}

fn read_entries(path: &Path) -> Result<Vec<ContributionEntry>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(NormalizeError::Contribution {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_slice(&bytes).map_err(|e| NormalizeError::Contribution {
        path: path.to_path_buf(),
        source: std::io::Error::new(ErrorKind::InvalidData, e),
    })
}
