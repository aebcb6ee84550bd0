//! Error types for Fretlog Core
//!
//! Provides error handling for:
//! - Store reads and refused writes
//! - Backup files that cannot be recognized or migrated
//! - Merge and restore input that fails validation
//! - Configuration files

use fretlog_merge::MergeError;
use fretlog_migrate::MigrationError;
use fretlog_model::ModelError;
use fretlog_store::StoreError;
use std::path::PathBuf;

/// Main Fretlog error type
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Store read or write failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Backup file rejected
    #[error("backup rejected: {0}")]
    Backup(#[from] BackupError),

    /// Merge or restore input rejected
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    /// Document operation failed
    #[error("document error: {0}")]
    Model(#[from] ModelError),

    /// Field value does not fit the document
    #[error("field `{name}` rejected: {source}")]
    InvalidField {
        /// Field name
        name: String,
        /// Why it does not fit
        #[source]
        source: serde_json::Error,
    },

    /// Document could not be serialized
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error in {path}: {reason}")]
    Config {
        /// File involved
        path: PathBuf,
        /// What went wrong
        reason: String,
    },
}

impl TrackerError {
    /// Check if the change did not persist
    ///
    /// The in-memory document is still correct; the caller must tell the
    /// user their change was not saved.
    #[inline]
    #[must_use]
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_persistence_failure())
    }

    /// Check if nothing was mutated and the operation can be retried
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Backup(_) | Self::InvalidField { .. } => true,
            Self::Merge(e) => e.is_validation(),
            Self::Store(e) => e.is_persistence_failure(),
            Self::Model(_) | Self::Serialization(_) | Self::Config { .. } => false,
        }
    }

    /// Create configuration error
    #[inline]
    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Backup file errors; none of them mutate anything
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// Not valid JSON
    #[error("backup is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// Valid JSON with no recognizable top-level shape
    #[error("unrecognized backup shape: {0}")]
    UnrecognizedShape(String),

    /// Recognized, but could not be brought to the current version
    #[error("backup could not be migrated: {0}")]
    Unmigratable(#[source] MigrationError),
}

impl BackupError {
    /// Create unrecognized-shape error
    #[inline]
    pub fn unrecognized(reason: impl Into<String>) -> Self {
        Self::UnrecognizedShape(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fretlog_merge::Side;

    #[test]
    fn persistence_failures_are_recoverable() {
        let err = TrackerError::from(StoreError::QuotaExceeded {
            key: "guitarTrackerData".into(),
            needed: 10,
            limit: 5,
        });
        assert!(err.is_persistence_failure());
        assert!(err.is_recoverable());
    }

    #[test]
    fn validation_failures_are_recoverable_but_not_persistence() {
        let err = TrackerError::from(BackupError::unrecognized("no data"));
        assert!(err.is_recoverable());
        assert!(!err.is_persistence_failure());

        let err = TrackerError::from(MergeError::NotCurrent {
            side: Side::Foreign,
            found: 3,
            expected: 6,
        });
        assert!(err.is_recoverable());
    }

    #[test]
    fn config_errors_name_the_file() {
        let err = TrackerError::config("/etc/fretlog.toml", "bad key");
        assert_eq!(
            err.to_string(),
            "configuration error in /etc/fretlog.toml: bad key"
        );
        assert!(!err.is_recoverable());
    }
}
