//! Fretlog Document Model
//!
//! The current-version shape of the persisted maintenance document.
//!
//! # Core Concepts
//!
//! - [`Document`]: the versioned unit of persistence
//! - [`InstanceState`]: complete history of one tracked instance
//! - [`TaskTable`]: task completion state per [`TaskCategory`]
//! - [`Timestamp`]: lenient timestamp that round-trips its encoding
//! - [`DocumentDigest`]: Blake3 digest of a document's canonical JSON
//!
//! # Example
//!
//! ```rust
//! use fretlog_model::{Document, CURRENT_VERSION};
//!
//! let doc = Document::default();
//! assert_eq!(doc.version, CURRENT_VERSION);
//! assert!(doc.validate().is_ok());
//! ```

#![warn(unreachable_pub)]

mod digest;
mod document;
mod error;
mod instance;
mod records;
mod serde_util;
mod task;
mod timestamp;

pub use digest::{canonicalize, DigestError, DocumentDigest};
pub use document::{Document, CURRENT_VERSION, UNMIGRATED_KEY};
pub use error::ModelError;
pub use instance::{
    default_catalog, DangerThresholds, HumidityRange, InstanceProfile, InstanceSettings,
    InstanceState, DEFAULT_INSTANCE_ID,
};
pub use records::{
    HumidityReading, Inventory, InventoryItem, PlayingSession, StringChange, TimerState,
};
pub use task::{TaskCategory, TaskRecord, TaskTable};
pub use timestamp::{Timestamp, TimestampKey};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
