//! Fretlog Storage
//!
//! The persistence substrate beneath the versioned document.
//!
//! # Core Concepts
//!
//! - [`KeyValueStore`]: raw `get`/`set`/`remove`/`clear` over text values
//! - [`MemoryStore`] and [`FileStore`]: the two shipped implementations
//! - [`StorageKeys`]: where the unified document and legacy entries live
//! - [`LegacySnapshot`]: read-only view of pre-consolidation entries
//!
//! # Architecture
//!
//! ```text
//! VersionedStore ──get/set──▶ KeyValueStore ◀──read── LegacySnapshot
//!                                  │
//!                       MemoryStore | FileStore
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod file;
pub mod keys;
pub mod kv;
pub mod legacy;

pub use error::StoreError;
pub use file::FileStore;
pub use keys::{LegacyKeys, StorageKeys};
pub use kv::{KeyValueStore, MemoryStore};
pub use legacy::LegacySnapshot;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
