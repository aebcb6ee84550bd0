//! Migration errors and warnings
//!
//! Errors abort the chain and make the engine substitute the default
//! document; warnings describe data that was recovered around.

use fretlog_model::ModelError;
use std::fmt::{self, Display, Formatter};

/// Reasons the chain could not produce a document
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Stored text is not valid JSON
    #[error("stored document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Parsed value is not a document of any known shape
    #[error("unrecognized document shape: {0}")]
    UnrecognizedShape(String),

    /// Version tag is newer than this build understands
    #[error("document version {found} is newer than supported version {supported}")]
    FutureVersion {
        /// Tag found
        found: u64,
        /// Highest version this build writes
        supported: u32,
    },

    /// No step starts at this version
    #[error("no migration step from version {0}")]
    MissingStep(u32),

    /// A step received or produced the wrong shape
    #[error("step {step} expected version {expected}, got {found}")]
    StepMismatch {
        /// Step description
        step: &'static str,
        /// Version the step needed
        expected: u32,
        /// Version it saw
        found: u32,
    },

    /// Migrated document violates a model invariant
    #[error("migrated document is invalid: {0}")]
    Invalid(#[from] ModelError),
}

impl MigrationError {
    /// Create an unrecognized-shape error
    pub fn unrecognized(reason: impl Into<String>) -> Self {
        Self::UnrecognizedShape(reason.into())
    }

    /// Whether stored data may still be readable by a newer build
    ///
    /// Such data must not be overwritten with the default document.
    #[inline]
    #[must_use]
    pub const fn is_future_data(&self) -> bool {
        matches!(self, Self::FutureVersion { .. })
    }
}

/// Recovered problems, reported alongside the migrated document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationWarning {
    /// A field did not have the expected shape and was set aside
    UnrecognizedField {
        /// Dotted path of the field
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// One element of a collection was set aside
    UnrecognizedRecord {
        /// Dotted path of the collection
        field: String,
        /// Position in the collection
        index: usize,
        /// Why it was rejected
        reason: String,
    },

    /// A legacy key held text that could not be read
    UnreadableLegacyKey {
        /// Key name
        key: String,
        /// Why it was rejected
        reason: String,
    },
}

impl Display for MigrationWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedField { field, reason } => {
                write!(f, "field `{field}` set aside: {reason}")
            }
            Self::UnrecognizedRecord {
                field,
                index,
                reason,
            } => write!(f, "record {index} of `{field}` set aside: {reason}"),
            Self::UnreadableLegacyKey { key, reason } => {
                write!(f, "legacy key `{key}` unreadable: {reason}")
            }
        }
    }
}
