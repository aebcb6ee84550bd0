//! Fretlog Merge/Restore Engine
//!
//! Reconciles an imported document with the live one, or replaces it.
//!
//! # Core Concepts
//!
//! - [`MergeStrategy`]: de-duplication key and conflict rule for one collection
//! - [`merge_documents`]: union of live and foreign, no duplicates, no losses
//! - [`restore_document`]: validated wholesale replacement
//! - [`MergeSummary`] / [`RestorePreview`]: what would change, with digests
//!
//! Both operations are pure: they take documents and return documents, and
//! can be run first as a preview and then again for real.
//!
//! | Collection | Key | Conflict |
//! |---|---|---|
//! | `humidityReadings` | timestamp | live kept |
//! | `playingSessions` | timestamp | live kept |
//! | `stringChangeHistory` | date | live kept |
//! | `maintenanceStates` | task id per category | most recent `lastCompleted` |
//! | `inventory.items` | item id | live kept |
//!
//! # Example
//!
//! ```rust
//! use fretlog_merge::merge_documents;
//! use fretlog_model::Document;
//!
//! let live = Document::default();
//! let outcome = merge_documents(&live, &live).unwrap();
//! assert!(outcome.summary.is_noop());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod collections;
mod error;
mod merge;
mod restore;
mod strategy;

pub use collections::{
    ItemsById, ReadingsByTimestamp, SessionsByTimestamp, StringChangesByDate, TasksByRecency,
};
pub use error::{MergeError, Side};
pub use merge::{merge_documents, merge_instance, InstanceSummary, MergeOutcome, MergeSummary};
pub use restore::{preview_restore, restore_document, RecordCounts, RestorePreview};
pub use strategy::{merge_collection, CollectionDelta, MergeStrategy, Resolution};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use fretlog_model::{Document, HumidityReading, PlayingSession};
    use fretlog_test_utils::{instant, GS_MINI};
    use pretty_assertions::assert_eq;

    #[test]
    fn preview_then_merge_agree() {
        let live = Document::default();
        let mut foreign = Document::default();
        {
            let gs = foreign.instance_mut(GS_MINI).unwrap();
            gs.add_humidity_reading(
                HumidityReading::new(47.0, None, "case", instant(2024, 6, 1, 9)).unwrap(),
            );
            gs.log_session(PlayingSession::new(25.0, instant(2024, 6, 1, 20)));
        }

        let preview = merge_documents(&live, &foreign).unwrap().summary;
        let outcome = merge_documents(&live, &foreign).unwrap();
        assert_eq!(preview, outcome.summary);
        assert_eq!(preview.records_added(), 2);

        let restore = preview_restore(&live, &foreign).unwrap();
        assert_eq!(restore.foreign_digest, outcome.summary.foreign_digest);
        assert!(!restore.loses_data());
    }
}
