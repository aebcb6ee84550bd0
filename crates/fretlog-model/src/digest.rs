//! Document digests
//!
//! [`DocumentDigest`] is a 32-byte Blake3 hash over the canonical JSON form
//! of a value: object keys sorted recursively, no insignificant whitespace.
//! Two documents that compare equal always produce the same digest, which
//! lets a backup preview tell the user whether an import changes anything.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte Blake3 digest of canonical JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentDigest([u8; 32]);

impl DocumentDigest {
    /// Wrap raw digest bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Digest of a serializable value
    ///
    /// # Errors
    /// Returns error if the value cannot be represented as JSON
    pub fn of<T: Serialize>(value: &T) -> Result<Self, DigestError> {
        let canonical = canonicalize(serde_json::to_value(value)?);
        let bytes = serde_json::to_vec(&canonical)?;
        Ok(Self::new(*blake3::hash(&bytes).as_bytes()))
    }

    /// First 16 hex characters, for log lines and previews
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

/// Sort object keys recursively
///
/// `serde_json` is built with `preserve_order`, so map iteration follows
/// insertion order; digests must not depend on it.
#[must_use]
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

impl Display for DocumentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for DocumentDigest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| DigestError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl Serialize for DocumentDigest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Errors produced while computing or parsing a digest
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// Value could not be encoded as JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Hex text did not decode
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Decoded bytes were not 32 long
    #[error("invalid digest length: expected 32, got {0}")]
    InvalidLength(usize),
}
