//! Cache key and namespace types shared by response cache adapters.
use std::fmt;

use thiserror::Error;

/// Disjoint key spaces inside the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// OCR output keyed by image fingerprint.
    TextDetection,
    /// Structured LLM output keyed by request fingerprint.
    StructuredExtraction,
}

impl CacheNamespace {
    /// Stable name used by adapters as a directory or key prefix.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TextDetection => "text_detection",
            Self::StructuredExtraction => "structured_extraction",
        }
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content-derived key for one cache entry.
///
/// Keys are restricted to ASCII letters, digits, `_` and `-` so file-backed
/// adapters can use them directly as file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Construct a cache key after validating its character set.
    ///
    /// # Examples
    /// ```
    /// use civet_backend::domain::ports::CacheKey;
    ///
    /// let key = CacheKey::new("ab12cd").expect("valid key");
    /// assert_eq!(key.as_str(), "ab12cd");
    /// ```
    pub fn new(value: impl Into<String>) -> Result<Self, CacheKeyValidationError> {
        let raw = value.into();
        if raw.trim().is_empty() {
            return Err(CacheKeyValidationError::Empty);
        }
        if raw.trim() != raw {
            return Err(CacheKeyValidationError::ContainsWhitespace);
        }
        if let Some(character) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(CacheKeyValidationError::InvalidCharacter { character });
        }
        Ok(Self(raw))
    }

    /// Borrow the underlying key as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Validation errors returned when constructing [`CacheKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheKeyValidationError {
    /// Key is empty after trimming whitespace.
    #[error("cache key must not be empty")]
    Empty,
    /// Key contains leading or trailing whitespace.
    #[error("cache key must not contain surrounding whitespace")]
    ContainsWhitespace,
    /// Key contains a character outside `[A-Za-z0-9_-]`.
    #[error("cache key contains invalid character {character:?}")]
    InvalidCharacter {
        /// First offending character.
        character: char,
    },
}
