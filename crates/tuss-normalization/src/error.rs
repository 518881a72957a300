use std::path::PathBuf;

use tuss_persistence::PersistenceError;
use tuss_standards::StandardsError;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("failed to load dictionary: {0}")]
    Dictionary(#[from] StandardsError),

    #[error("mapping cache error: {0}")]
    Cache(#[from] PersistenceError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("exam name {0:?} has no matchable characters")]
    EmptyName(String),

    #[error("failed to write contributions to {path}: {source}")]
    Contribution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, NormalizeError>;
