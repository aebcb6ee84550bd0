//! Backup import flow
//!
//! Parse, migrate, preview, confirm, write. Everything up to the write is
//! side-effect free, so a rejected or declined import leaves the store
//! exactly as it was.

use crate::accessor::VersionedStore;
use crate::backup::BackupPayload;
use crate::error::TrackerError;
use fretlog_merge::{merge_documents, preview_restore, restore_document, MergeSummary, RestorePreview};
use fretlog_migrate::MigrationReport;
use fretlog_model::Document;
use fretlog_store::KeyValueStore;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// How a backup is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportMode {
    /// Union of live and backup; no live record is lost
    Merge,
    /// Backup replaces the live document
    Restore,
}

impl Display for ImportMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merge => f.write_str("merge"),
            Self::Restore => f.write_str("restore"),
        }
    }
}

/// What an import would do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ImportPreview {
    /// Records the merge adds or replaces
    Merge(MergeSummary),
    /// Records the restore brings in or loses
    Restore(RestorePreview),
}

impl ImportPreview {
    /// Whether applying would leave the live document unchanged
    #[must_use]
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Merge(summary) => summary.is_noop(),
            Self::Restore(preview) => preview.is_noop(),
        }
    }

    /// Mode this preview was computed for
    #[must_use]
    pub const fn mode(&self) -> ImportMode {
        match self {
            Self::Merge(_) => ImportMode::Merge,
            Self::Restore(_) => ImportMode::Restore,
        }
    }
}

impl Display for ImportPreview {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merge(summary) => Display::fmt(summary, f),
            Self::Restore(preview) => Display::fmt(preview, f),
        }
    }
}

/// Caller's answer to a destructive import
pub trait Confirmation {
    /// Whether to go ahead with the previewed import
    fn confirm(&mut self, preview: &ImportPreview) -> bool;
}

impl<F: FnMut(&ImportPreview) -> bool> Confirmation for F {
    fn confirm(&mut self, preview: &ImportPreview) -> bool {
        self(preview)
    }
}

/// A fully computed, not yet applied import
#[derive(Debug)]
pub struct ImportPlan {
    /// Recognized backup shape
    pub kind: &'static str,
    /// How the backup was brought to the current version
    pub report: MigrationReport,
    /// What applying would do
    pub preview: ImportPreview,
    /// Document that applying would write
    pub document: Document,
}

/// Result of [`BackupImporter::import`]
#[derive(Debug)]
pub enum ImportOutcome {
    /// Written in one `set_document`
    Applied {
        /// What was changed
        preview: ImportPreview,
        /// How the backup was brought to the current version, warnings included
        report: MigrationReport,
    },
    /// Nothing would change; nothing was written
    Unchanged,
    /// The caller declined a restore; nothing was written
    Declined,
}

/// Applies backup files to a versioned store
#[derive(Debug)]
pub struct BackupImporter<'a, S> {
    tracker: &'a VersionedStore<S>,
}

impl<'a, S: KeyValueStore> BackupImporter<'a, S> {
    /// Importer writing through `tracker`
    #[must_use]
    pub const fn new(tracker: &'a VersionedStore<S>) -> Self {
        Self { tracker }
    }

    /// Compute what importing `text` would do, writing nothing
    ///
    /// # Errors
    /// Returns error if the backup is unrecognized, cannot be migrated, or
    /// fails validation, or if the store cannot be read
    pub fn plan(&self, text: &str, mode: ImportMode) -> Result<ImportPlan, TrackerError> {
        let payload = BackupPayload::parse(text)?;
        let kind = payload.kind();
        let (foreign, report) = payload.into_document(self.tracker.engine())?;
        let (live, live_report) = self.tracker.read()?;
        if live_report.is_fallback() {
            tracing::warn!(%mode, "live data is unreadable; importing over the default document");
        }

        let (preview, document) = match mode {
            ImportMode::Merge => {
                let outcome = merge_documents(&live, &foreign)?;
                (ImportPreview::Merge(outcome.summary), outcome.document)
            }
            ImportMode::Restore => {
                let preview = preview_restore(&live, &foreign)?;
                (ImportPreview::Restore(preview), restore_document(foreign)?)
            }
        };
        tracing::info!(kind, %mode, noop = preview.is_noop(), "import planned");
        Ok(ImportPlan {
            kind,
            report,
            preview,
            document,
        })
    }

    /// Import `text`
    ///
    /// `confirmation` is consulted for a restore only, after the preview is
    /// computed. A merge never discards live records and is applied
    /// directly.
    ///
    /// # Errors
    /// Returns error if planning fails or the write is refused
    pub fn import(
        &self,
        text: &str,
        mode: ImportMode,
        confirmation: &mut dyn Confirmation,
    ) -> Result<ImportOutcome, TrackerError> {
        let ImportPlan {
            kind,
            report,
            preview,
            mut document,
        } = self.plan(text, mode)?;

        if preview.is_noop() {
            tracing::info!(kind, %mode, "backup changes nothing");
            return Ok(ImportOutcome::Unchanged);
        }
        if mode == ImportMode::Restore && !confirmation.confirm(&preview) {
            tracing::info!(kind, "restore declined");
            return Ok(ImportOutcome::Declined);
        }

        self.tracker.set_document(&mut document)?;
        tracing::info!(kind, %mode, warnings = report.warnings.len(), "backup applied");
        Ok(ImportOutcome::Applied { preview, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupEnvelope;
    use crate::config::TrackerConfig;
    use fretlog_migrate::MigrationWarning;
    use fretlog_model::UNMIGRATED_KEY;
    use fretlog_store::MemoryStore;
    use fretlog_test_utils::{document_with_readings, instant, reading, GS_MINI};
    use pretty_assertions::assert_eq;

    fn seeded(doc: &Document) -> VersionedStore<MemoryStore> {
        let tracker = VersionedStore::new(MemoryStore::new(), TrackerConfig::default());
        tracker.set_document(&mut doc.clone()).unwrap();
        tracker
    }

    fn backup_of(doc: Document) -> String {
        BackupEnvelope::new(doc, instant(2024, 6, 1, 0))
            .to_json_pretty()
            .unwrap()
    }

    #[test]
    fn plan_writes_nothing() {
        let tracker = seeded(&document_with_readings(vec![reading(1, "2024-01-01T10:00:00Z", 40.0)]));
        let before = tracker.store().snapshot();
        let text = backup_of(document_with_readings(vec![reading(2, "2024-01-02T10:00:00Z", 50.0)]));
        let importer = BackupImporter::new(&tracker);
        importer.plan(&text, ImportMode::Merge).unwrap();
        importer.plan(&text, ImportMode::Restore).unwrap();
        assert_eq!(tracker.store().snapshot(), before);
    }

    #[test]
    fn merge_does_not_ask() {
        let tracker = seeded(&document_with_readings(vec![reading(1, "2024-01-01T10:00:00Z", 40.0)]));
        let text = backup_of(document_with_readings(vec![reading(2, "2024-01-02T10:00:00Z", 50.0)]));
        let mut asked = false;
        let outcome = BackupImporter::new(&tracker)
            .import(&text, ImportMode::Merge, &mut |_: &ImportPreview| {
                asked = true;
                false
            })
            .unwrap();
        assert!(!asked);
        assert!(matches!(
            outcome,
            ImportOutcome::Applied { preview: ImportPreview::Merge(_), .. }
        ));
        let doc = tracker.get_document().unwrap();
        assert_eq!(doc.instances[GS_MINI].humidity_readings.len(), 2);
    }

    #[test]
    fn declined_restore_is_a_noop() {
        let live = document_with_readings(vec![reading(1, "2024-01-01T10:00:00Z", 40.0)]);
        let tracker = seeded(&live);
        let before = tracker.store().snapshot();
        let mut shown = None;
        let outcome = BackupImporter::new(&tracker)
            .import(&backup_of(Document::default()), ImportMode::Restore, &mut |p: &ImportPreview| {
                shown = Some(p.clone());
                false
            })
            .unwrap();
        assert!(matches!(outcome, ImportOutcome::Declined));
        assert_eq!(tracker.store().snapshot(), before);
        let Some(ImportPreview::Restore(preview)) = shown else {
            panic!("restore preview was not shown");
        };
        assert!(preview.loses_data());
        assert_eq!(preview.lost.humidity_readings, 1);
    }

    #[test]
    fn identical_backup_changes_nothing() {
        let live = document_with_readings(vec![reading(1, "2024-01-01T10:00:00Z", 40.0)]);
        let tracker = seeded(&live);
        let importer = BackupImporter::new(&tracker);
        for mode in [ImportMode::Merge, ImportMode::Restore] {
            let outcome = importer
                .import(&backup_of(live.clone()), mode, &mut |_: &ImportPreview| true)
                .unwrap();
            assert!(matches!(outcome, ImportOutcome::Unchanged));
        }
    }

    #[test]
    fn malformed_legacy_backup_record_is_kept_and_reported() {
        let tracker = seeded(&Document::default());
        let text = serde_json::json!({
            "exportDate": "2023-11-01T00:00:00.000Z",
            "version": 1,
            "tasks": {"daily": [{"id": "daily-1", "completed": true}]},
            "humidity": [
                {"id": 1, "timestamp": "2023-10-01T10:00:00Z", "humidity": 45},
                {"id": 2, "timestamp": "2023-10-02T10:00:00Z", "humidity": "47%"}
            ]
        })
        .to_string();
        let outcome = BackupImporter::new(&tracker)
            .import(&text, ImportMode::Merge, &mut |_: &ImportPreview| true)
            .unwrap();
        let ImportOutcome::Applied { report, .. } = outcome else {
            panic!("merge was not applied: {outcome:?}");
        };
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            MigrationWarning::UnrecognizedRecord { index: 1, .. }
        )));

        let doc = tracker.get_document().unwrap();
        assert_eq!(doc.instances[GS_MINI].humidity_readings.len(), 1);
        assert_eq!(
            doc.extra[UNMIGRATED_KEY]["humidityReadings"][0]["humidity"],
            serde_json::json!("47%")
        );
    }

    #[test]
    fn rejected_backup_leaves_store_alone() {
        let tracker = seeded(&Document::default());
        let before = tracker.store().snapshot();
        let err = BackupImporter::new(&tracker)
            .import(r#"{"hello": 1}"#, ImportMode::Restore, &mut |_: &ImportPreview| true)
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(tracker.store().snapshot(), before);
    }
}
