//! Content fingerprints identifying images and structured requests.
//!
//! Both fingerprints are lowercase hexadecimal SHA-256 digests. An image
//! fingerprint hashes the raw bytes; a request fingerprint hashes the
//! canonical JSON form of everything that influences a structured completion,
//! so changing the prompt, input, schema name, or schema yields a new key.

use std::fmt;

use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::ports::{CacheKey, CacheKeyValidationError};

const DIGEST_HEX_LEN: usize = 64;

/// Validation errors raised when parsing a fingerprint from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerprintValidationError {
    /// Input did not have 64 characters.
    #[error("fingerprint must be {expected} hex characters, got {actual}")]
    InvalidLength {
        /// Required number of characters.
        expected: usize,
        /// Number of characters supplied.
        actual: usize,
    },
    /// Input contained something other than lowercase hex digits.
    #[error("fingerprint must be lowercase hexadecimal")]
    InvalidCharacter,
    /// Canonical JSON encoding failed.
    #[error("failed to serialise canonical request: {message}")]
    Serialization {
        /// Description of the serialisation failure.
        message: String,
    },
}

/// SHA-256 of raw image bytes; the identity of a receipt image.
///
/// Identical bytes always produce the same fingerprint regardless of the file
/// name they were uploaded under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageFingerprint(String);

impl ImageFingerprint {
    /// Hash `bytes` into a fingerprint.
    ///
    /// # Examples
    /// ```
    /// use civet_backend::domain::ImageFingerprint;
    ///
    /// let fingerprint = ImageFingerprint::of(b"test");
    /// assert_eq!(
    ///     fingerprint.as_str(),
    ///     "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
    /// );
    /// ```
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Parse a previously rendered fingerprint.
    pub fn parse(value: &str) -> Result<Self, FingerprintValidationError> {
        validate_digest(value)?;
        Ok(Self(value.to_owned()))
    }

    /// Borrow the hex digest.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Cache key for this fingerprint.
    pub fn cache_key(&self) -> Result<CacheKey, CacheKeyValidationError> {
        CacheKey::new(self.0.as_str())
    }
}

impl fmt::Display for ImageFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for ImageFingerprint {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// SHA-256 of the canonical JSON encoding of a structured request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    /// Fingerprint the four inputs that determine a structured completion.
    ///
    /// Canonical form sorts object keys recursively, keeps array order and
    /// serialises without whitespace, so key order inside `schema` does not
    /// affect the result.
    pub fn for_structured_request(
        prompt: &str,
        input: &str,
        schema_name: &str,
        schema: &Value,
    ) -> Result<Self, FingerprintValidationError> {
        let request = json!({
            "prompt": prompt,
            "input": input,
            "schema_name": schema_name,
            "schema": schema,
        });
        let bytes = serde_json::to_vec(&canonicalize(&request)).map_err(|err| {
            FingerprintValidationError::Serialization {
                message: err.to_string(),
            }
        })?;
        Ok(Self(hex::encode(Sha256::digest(&bytes))))
    }

    /// Borrow the hex digest.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Cache key for this fingerprint.
    pub fn cache_key(&self) -> Result<CacheKey, CacheKeyValidationError> {
        CacheKey::new(self.0.as_str())
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn validate_digest(value: &str) -> Result<(), FingerprintValidationError> {
    if value.len() != DIGEST_HEX_LEN {
        return Err(FingerprintValidationError::InvalidLength {
            expected: DIGEST_HEX_LEN,
            actual: value.chars().count(),
        });
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return Err(FingerprintValidationError::InvalidCharacter);
    }
    Ok(())
}

/// Recursively sort object keys for the canonical representation.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by_key(|(k, _)| k.as_str());
            let canonical: Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            Value::Object(canonical)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    //! Fingerprint stability and sensitivity checks.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn image_fingerprint_is_stable_for_identical_bytes() {
        let first = ImageFingerprint::of(b"receipt-bytes");
        let second = ImageFingerprint::of(b"receipt-bytes");
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 64);
    }

    #[rstest]
    fn one_byte_difference_changes_image_fingerprint() {
        let first = ImageFingerprint::of(&[0_u8, 1, 2, 3]);
        let second = ImageFingerprint::of(&[0_u8, 1, 2, 4]);
        assert_ne!(first, second);
    }

    #[rstest]
    fn image_fingerprint_matches_known_digest() {
        let fingerprint = ImageFingerprint::of(b"");
        assert_eq!(
            fingerprint.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[rstest]
    fn parse_round_trips_rendered_fingerprint() {
        let fingerprint = ImageFingerprint::of(b"abc");
        let parsed = ImageFingerprint::parse(fingerprint.as_str()).expect("valid digest");
        assert_eq!(parsed, fingerprint);
    }

    #[rstest]
    #[case("abc", FingerprintValidationError::InvalidLength { expected: 64, actual: 3 })]
    #[case(
        "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855",
        FingerprintValidationError::InvalidCharacter
    )]
    #[case(
        "z3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        FingerprintValidationError::InvalidCharacter
    )]
    fn parse_rejects_malformed_digests(
        #[case] input: &str,
        #[case] expected: FingerprintValidationError,
    ) {
        assert_eq!(ImageFingerprint::parse(input), Err(expected));
    }

    #[rstest]
    fn fingerprints_are_valid_cache_keys() {
        let image = ImageFingerprint::of(b"abc");
        let key = image.cache_key().expect("hex is a valid key");
        assert_eq!(key.as_str(), image.as_str());
    }

    fn schema() -> Value {
        json!({"type": "object", "properties": {"a": {"type": "string"}}})
    }

    fn baseline() -> RequestFingerprint {
        RequestFingerprint::for_structured_request("prompt", "input", "name", &schema())
            .expect("fingerprint")
    }

    #[rstest]
    fn request_fingerprint_ignores_schema_key_order() {
        let reordered = json!({"properties": {"a": {"type": "string"}}, "type": "object"});
        let fingerprint =
            RequestFingerprint::for_structured_request("prompt", "input", "name", &reordered)
                .expect("fingerprint");
        assert_eq!(fingerprint, baseline());
    }

    #[rstest]
    #[case::prompt("other prompt", "input", "name", schema())]
    #[case::input("prompt", "other input", "name", schema())]
    #[case::schema_name("prompt", "input", "other_name", schema())]
    #[case::schema("prompt", "input", "name", json!({"type": "object"}))]
    fn request_fingerprint_changes_with_any_input(
        #[case] prompt: &str,
        #[case] input: &str,
        #[case] schema_name: &str,
        #[case] schema: Value,
    ) {
        let fingerprint =
            RequestFingerprint::for_structured_request(prompt, input, schema_name, &schema)
                .expect("fingerprint");
        assert_ne!(fingerprint, baseline());
    }
}
