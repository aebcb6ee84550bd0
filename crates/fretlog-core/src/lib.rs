//! Fretlog Core - versioned document access and backup import
//!
//! Ties the store, the migration engine and the merge engine together:
//! - [`VersionedStore`] reads and writes the unified document, migrating
//!   transparently on every read
//! - [`BackupEnvelope`] and [`BackupPayload`] write and recognize backup files
//! - [`BackupImporter`] previews and applies a backup as a merge or a restore
//! - [`TrackerConfig`] holds storage keys and the instance catalog
//!
//! # Example
//!
//! ```rust
//! use fretlog_core::{BackupImporter, ImportMode, ImportPreview, TrackerConfig, VersionedStore};
//! use fretlog_store::MemoryStore;
//!
//! # fn main() -> Result<(), fretlog_core::TrackerError> {
//! let tracker = VersionedStore::new(MemoryStore::new(), TrackerConfig::default());
//! let mut doc = tracker.get_document()?;
//! doc.set_active_instance("prs-ce24")?;
//! tracker.set_document(&mut doc)?;
//!
//! let backup = tracker.export(chrono::Utc::now())?.to_json_pretty()?;
//! let outcome = BackupImporter::new(&tracker).import(
//!     &backup,
//!     ImportMode::Restore,
//!     &mut |preview: &ImportPreview| !preview.is_noop(),
//! )?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

mod accessor;
mod backup;
mod config;
mod error;
mod import;

pub use accessor::{Loaded, PersistOutcome, VersionedStore};
pub use backup::{BackupEnvelope, BackupPayload, DEFAULT_BACKUP_FILE};
pub use config::TrackerConfig;
pub use error::{BackupError, TrackerError};
pub use import::{
    BackupImporter, Confirmation, ImportMode, ImportOutcome, ImportPlan, ImportPreview,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
