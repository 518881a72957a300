//! Cache saving operations.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{PersistenceError, Result};
use crate::types::CacheFile;

/// Write a cache file as pretty-printed JSON.
///
/// Uses atomic write (temp file + rename) so a crash never leaves a
/// truncated cache behind.
pub fn write_cache_file(file: &CacheFile, path: &Path) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(file)
        .map_err(|e| PersistenceError::Serialization { source: e })?;

    let temp_path = temp_path_for(path);

    // Create parent directory if needed
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| PersistenceError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut out = File::create(&temp_path).map_err(|e| PersistenceError::Io {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;

    out.write_all(&bytes).map_err(|e| PersistenceError::Io {
        operation: "write",
        path: temp_path.clone(),
        source: e,
    })?;

    out.sync_all().map_err(|e| PersistenceError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| PersistenceError::AtomicWriteFailed {
        temp_path: temp_path.clone(),
        target_path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(
        entries = file.mappings.len(),
        "Saved mapping cache to {}",
        path.display()
    );
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
