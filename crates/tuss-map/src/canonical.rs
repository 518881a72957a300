//! Canonical keys for exam names.
//!
//! Every comparison in the engine happens between canonical keys. The
//! canonicalizer is the only normalization boundary:
//!
//! 1. uppercase
//! 2. canonical decomposition (NFD), combining marks dropped
//! 3. characters outside `A-Z 0-9 space - / ( )` removed
//! 4. whitespace runs collapsed to one space, ends trimmed

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalized form of an exam name used for indexing and cache keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the key of an empty (or punctuation-only) name.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    /// Consume the key, returning the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CanonicalKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CanonicalKey {
    fn from(text: &str) -> Self {
        canon(text)
    }
}

/// Canonicalize free text into a [`CanonicalKey`].
///
/// Total and idempotent: `canon(canon(x).as_str()) == canon(x)`.
pub fn canon(text: &str) -> CanonicalKey {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text
        .to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
    {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if !is_key_char(ch) {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }

    CanonicalKey(out)
}

fn is_key_char(ch: char) -> bool {
    ch.is_ascii_uppercase() || ch.is_ascii_digit() || matches!(ch, '-' | '/' | '(' | ')')
}
