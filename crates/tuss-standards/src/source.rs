//! Where a dictionary comes from.

use std::path::{Path, PathBuf};

use tuss_model::DictionaryBlob;

use crate::dictionary::parse_blob;
use crate::error::{Result, StandardsError};

/// Capability to produce a dictionary blob.
///
/// The engine only depends on this trait; file, in-memory and remote
/// sources are interchangeable.
pub trait DictionarySource {
    fn load(&self) -> Result<DictionaryBlob>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Dictionary stored as a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileDictionarySource {
    path: PathBuf,
}

impl FileDictionarySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DictionarySource for FileDictionarySource {
    fn load(&self) -> Result<DictionaryBlob> {
        let bytes = std::fs::read(&self.path).map_err(|e| StandardsError::io(&self.path, e))?;
        parse_blob(&bytes, &self.path.display().to_string())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Dictionary already held in memory (tests, embedding callers).
#[derive(Debug, Clone, Default)]
pub struct InMemoryDictionarySource {
    blob: DictionaryBlob,
}

impl InMemoryDictionarySource {
    pub fn new(blob: DictionaryBlob) -> Self {
        Self { blob }
    }
}

impl DictionarySource for InMemoryDictionarySource {
    fn load(&self) -> Result<DictionaryBlob> {
        Ok(self.blob.clone())
    }

    fn describe(&self) -> String {
        format!("memory:{} entries", self.blob.exams.len())
    }
}

impl<S: DictionarySource + ?Sized> DictionarySource for &S {
    fn load(&self) -> Result<DictionaryBlob> {
        (**self).load()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
