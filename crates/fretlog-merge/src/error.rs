//! Merge and restore errors

use fretlog_model::{DigestError, ModelError};
use std::fmt::{self, Display, Formatter};

/// Which document an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The document currently persisted
    Live,
    /// The document being imported
    Foreign,
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Foreign => f.write_str("foreign"),
        }
    }
}

/// Merge and restore failures; none of them mutate anything
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Document is not at the current version
    #[error("{side} document is at version {found}, expected {expected}; migrate it first")]
    NotCurrent {
        /// Offending side
        side: Side,
        /// Version found
        found: u32,
        /// Version required
        expected: u32,
    },

    /// Document breaks a structural invariant
    #[error("{side} document is invalid: {source}")]
    Invalid {
        /// Offending side
        side: Side,
        /// Violated invariant
        #[source]
        source: ModelError,
    },

    /// Digest could not be computed
    #[error("digest failed: {0}")]
    Digest(#[from] DigestError),
}

impl MergeError {
    /// Whether the input was rejected rather than failing mid-way
    #[inline]
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::NotCurrent { .. } | Self::Invalid { .. })
    }
}
