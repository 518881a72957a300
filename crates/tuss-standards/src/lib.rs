#![deny(unsafe_code)]

//! TUSS dictionary loading.
//!
//! A dictionary reaches the engine through a [`DictionarySource`]: a local
//! file, an in-memory blob, or a remote URL backed by an ETag/TTL cache.
//! [`Dictionary::from_blob`] keeps well-formed records and counts the rest;
//! [`validate_document`] reports data-quality issues for curation tooling.

pub mod dictionary;
pub mod error;
pub mod hash;
pub mod remote;
pub mod source;
pub mod validate;

pub use dictionary::{Dictionary, dictionary_version, parse_blob};
pub use error::{Result, StandardsError};
pub use hash::sha256_hex;
pub use remote::{
    DEFAULT_REMOTE_URL, DictionaryOrigin, RemoteConfig, RemoteDictionarySource, SourceStatus,
};
pub use source::{DictionarySource, FileDictionarySource, InMemoryDictionarySource};
pub use validate::{
    DuplicateCode, ValidationReport, validate_blob, validate_document, validate_file,
};
