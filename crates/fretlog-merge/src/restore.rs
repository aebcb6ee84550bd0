//! Wholesale replacement of the live document

use crate::collections::{ReadingsByTimestamp, SessionsByTimestamp, StringChangesByDate};
use crate::error::{MergeError, Side};
use crate::strategy::MergeStrategy;
use fretlog_model::{Document, DocumentDigest, InstanceState, CURRENT_VERSION};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// Record counts, used to describe what a restore brings in or drops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCounts {
    /// Instances
    pub instances: usize,
    /// Humidity readings
    pub humidity_readings: usize,
    /// Playing sessions
    pub playing_sessions: usize,
    /// String changes
    pub string_changes: usize,
    /// Tasks marked completed
    pub completed_tasks: usize,
}

impl RecordCounts {
    /// Count everything in `doc`
    #[must_use]
    pub fn of(doc: &Document) -> Self {
        let mut counts = Self::default();
        for instance in doc.instances.values() {
            counts += Self::of_instance(instance);
        }
        counts
    }

    fn of_instance(instance: &InstanceState) -> Self {
        Self {
            instances: 1,
            humidity_readings: instance.humidity_readings.len(),
            playing_sessions: instance.playing_sessions.len(),
            string_changes: instance.string_change_history.len(),
            completed_tasks: completed(instance).count(),
        }
    }

    /// Whether every count is zero
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.instances == 0
            && self.humidity_readings == 0
            && self.playing_sessions == 0
            && self.string_changes == 0
            && self.completed_tasks == 0
    }
}

impl std::ops::AddAssign for RecordCounts {
    fn add_assign(&mut self, other: Self) {
        self.instances += other.instances;
        self.humidity_readings += other.humidity_readings;
        self.playing_sessions += other.playing_sessions;
        self.string_changes += other.string_changes;
        self.completed_tasks += other.completed_tasks;
    }
}

fn completed(instance: &InstanceState) -> impl Iterator<Item = &str> {
    instance
        .maintenance_states
        .values()
        .flatten()
        .filter(|task| task.completed)
        .map(|task| task.id.as_str())
}

/// What a restore would do, computed without doing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorePreview {
    /// Live document digest
    pub live_digest: DocumentDigest,
    /// Digest of the document that would be written
    pub foreign_digest: DocumentDigest,
    /// Everything in the incoming document
    pub incoming: RecordCounts,
    /// Live records with no counterpart in the incoming document
    pub lost: RecordCounts,
}

impl RestorePreview {
    /// Whether restoring would leave the live document as it is
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.live_digest == self.foreign_digest
    }

    /// Whether any live record would disappear
    #[inline]
    #[must_use]
    pub const fn loses_data(&self) -> bool {
        !self.lost.is_empty()
    }
}

impl Display for RestorePreview {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "replace {} with {}",
            self.live_digest.short(),
            self.foreign_digest.short()
        )?;
        if self.is_noop() {
            return writeln!(f, "no change");
        }
        let RecordCounts {
            instances,
            humidity_readings,
            playing_sessions,
            string_changes,
            completed_tasks,
        } = self.incoming;
        writeln!(
            f,
            "incoming: {instances} instances, {humidity_readings} readings, {playing_sessions} sessions, {string_changes} string changes, {completed_tasks} completed tasks"
        )?;
        let lost = self.lost;
        writeln!(
            f,
            "lost: {} instances, {} readings, {} sessions, {} string changes, {} completed tasks",
            lost.instances,
            lost.humidity_readings,
            lost.playing_sessions,
            lost.string_changes,
            lost.completed_tasks
        )
    }
}

/// Stamp and validate a foreign document for restore
///
/// # Errors
/// Returns error if the document is newer than this build or invalid
pub fn restore_document(mut foreign: Document) -> Result<Document, MergeError> {
    if foreign.version > CURRENT_VERSION {
        return Err(MergeError::NotCurrent {
            side: Side::Foreign,
            found: foreign.version,
            expected: CURRENT_VERSION,
        });
    }
    foreign.version = CURRENT_VERSION;
    foreign.validate().map_err(|source| MergeError::Invalid {
        side: Side::Foreign,
        source,
    })?;
    Ok(foreign)
}

/// Describe replacing `live` with `foreign`
///
/// # Errors
/// Returns error if `foreign` would be rejected by [`restore_document`]
pub fn preview_restore(live: &Document, foreign: &Document) -> Result<RestorePreview, MergeError> {
    let restored = restore_document(foreign.clone())?;
    let mut lost = RecordCounts::default();
    for (id, instance) in &live.instances {
        let Some(incoming) = restored.instances.get(id) else {
            lost += RecordCounts::of_instance(instance);
            continue;
        };
        lost.humidity_readings += missing(
            &ReadingsByTimestamp,
            &instance.humidity_readings,
            &incoming.humidity_readings,
        );
        lost.playing_sessions += missing(
            &SessionsByTimestamp,
            &instance.playing_sessions,
            &incoming.playing_sessions,
        );
        lost.string_changes += missing(
            &StringChangesByDate,
            &instance.string_change_history,
            &incoming.string_change_history,
        );
        let still_completed: BTreeSet<&str> = completed(incoming).collect();
        lost.completed_tasks += completed(instance)
            .filter(|id| !still_completed.contains(id))
            .count();
    }
    Ok(RestorePreview {
        live_digest: DocumentDigest::of(live)?,
        foreign_digest: DocumentDigest::of(&restored)?,
        incoming: RecordCounts::of(&restored),
        lost,
    })
}

/// Live records whose key the incoming collection lacks
fn missing<S: MergeStrategy>(strategy: &S, live: &[S::Record], incoming: &[S::Record]) -> usize {
    let keys: BTreeSet<S::Key> = incoming.iter().map(|r| strategy.key(r)).collect();
    live.iter().filter(|r| !keys.contains(&strategy.key(r))).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fretlog_test_utils::{document_with_readings, reading, GS_MINI, PRS};
    use pretty_assertions::assert_eq;

    #[test]
    fn restore_stamps_current_version() {
        let mut doc = document_with_readings(vec![reading(1, "2024-01-01", 45.0)]);
        doc.version = 4;
        let restored = restore_document(doc.clone()).unwrap();
        assert_eq!(restored.version, CURRENT_VERSION);
        doc.version = CURRENT_VERSION;
        assert_eq!(restored, doc);
    }

    #[test]
    fn restore_rejects_invalid_and_future_documents() {
        let mut doc = Document::default();
        doc.version = CURRENT_VERSION + 1;
        assert!(restore_document(doc).unwrap_err().is_validation());

        let mut empty = Document::default();
        empty.instances.clear();
        assert!(matches!(
            restore_document(empty),
            Err(MergeError::Invalid { side: Side::Foreign, .. })
        ));
    }

    #[test]
    fn preview_counts_what_would_be_lost() {
        let live = document_with_readings(vec![
            reading(1, "2024-01-01", 45.0),
            reading(2, "2024-01-02", 46.0),
        ]);
        let mut foreign = document_with_readings(vec![reading(9, "2024-01-02", 50.0)]);
        foreign.instances.remove(PRS);

        let preview = preview_restore(&live, &foreign).unwrap();
        assert_eq!(preview.lost.humidity_readings, 1);
        assert_eq!(preview.lost.instances, 1);
        assert_eq!(preview.incoming.instances, 1);
        assert_eq!(preview.incoming.humidity_readings, 1);
        assert!(preview.loses_data());
        assert!(!preview.is_noop());
        assert!(live.instances[GS_MINI].humidity_readings.len() == 2);
    }

    #[test]
    fn preview_of_identical_document_is_noop() {
        let live = document_with_readings(vec![reading(1, "2024-01-01", 45.0)]);
        let preview = preview_restore(&live, &live).unwrap();
        assert!(preview.is_noop());
        assert!(!preview.loses_data());
        assert!(preview.to_string().contains("no change"));
    }
}
