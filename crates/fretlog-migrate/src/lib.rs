//! Fretlog Migration Engine
//!
//! Brings any historical shape of the persisted document to the current
//! version.
//!
//! # Core Concepts
//!
//! - [`MigrationEngine`]: `migrate(raw) → document + report`, never fails
//! - [`VersionedShape`]: a parsed document tagged with its version
//! - [`MigrationStep`]: one transform per adjacent pair of versions
//! - [`IdRemap`]: explicit task id translation tables
//! - [`MigrationReport`]: entry point, steps applied, warnings, repairs
//!
//! # Architecture
//!
//! ```text
//! unified text ──parse──▶ VersionedShape(vN) ──step──▶ … ──step──▶ V6 ──integrity──▶ Document
//! legacy keys ──synthesize──▶ V2 ──────────┘
//! nothing ────────────────────────────────────────────────────────────▶ fresh Document
//! ```
//!
//! # Example
//!
//! ```rust
//! use fretlog_migrate::{EntryPoint, MigrationEngine, RawStoredInput};
//!
//! let outcome = MigrationEngine::default().migrate(&RawStoredInput::unified(r#"{"version": 4}"#));
//! assert_eq!(outcome.report.entry, EntryPoint::Stale { from: 4 });
//! assert_eq!(outcome.document.version, 6);
//! ```

#![warn(unreachable_pub)]

mod engine;
mod error;
mod integrity;
mod legacy;
mod lenient;
mod options;
mod remap;
mod report;
mod shape;
mod steps;

pub use engine::{MigrationEngine, MigrationOutcome, RawStoredInput};
pub use error::{MigrationError, MigrationWarning};
pub use legacy::LEGACY_READING_TAG;
pub use options::{MigrationOptions, DEFAULT_STRING_TYPE};
pub use remap::{normalize_six_week, IdRemap};
pub use report::{AppliedStep, EntryPoint, MigrationReport, Repair};
pub use shape::{FlatDocument, VersionedShape};
pub use steps::{step_from, steps, MigrationStep};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
