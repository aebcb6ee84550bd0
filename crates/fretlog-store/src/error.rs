//! Error types for the persistence substrate

use std::path::PathBuf;

/// Errors raised by a [`KeyValueStore`](crate::KeyValueStore)
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store refused a write
    #[error("write to `{key}` refused: {reason}")]
    Write {
        /// Key being written
        key: String,
        /// Store-specific reason
        reason: String,
    },

    /// The write would exceed the store's capacity
    #[error("quota exceeded writing `{key}`: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded {
        /// Key being written
        key: String,
        /// Total bytes the store would hold after the write
        needed: usize,
        /// Capacity in bytes
        limit: usize,
    },

    /// Filesystem failure
    #[error("io error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Backing file is not a JSON object of strings
    #[error("store file {path} is corrupt: {source}")]
    Corrupt {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Create a refused-write error
    pub fn write(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Write {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a write did not persist
    ///
    /// The caller's in-memory document is still correct when this is true.
    #[inline]
    #[must_use]
    pub const fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::Write { .. } | Self::QuotaExceeded { .. } | Self::Io { .. })
    }
}
