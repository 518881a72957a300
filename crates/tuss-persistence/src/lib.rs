#![deny(unsafe_code)]

//! Persistent storage for the exam-name mapping cache.
//!
//! The cache file is a JSON document keyed by canonical exam name. It is
//! loaded once per engine, updated in memory, and written back atomically.

pub mod cache;
pub mod error;
pub mod io;
pub mod types;

pub use cache::{DEFAULT_CACHE_FILE, MappingCache};
pub use error::{PersistenceError, Result};
pub use types::{CACHE_FORMAT_VERSION, CacheEntry, CacheFile, CacheMetadata, CacheUpdate};
