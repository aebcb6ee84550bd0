//! Migration engine
//!
//! Picks the entry point, walks the step table one version at a time, and
//! runs the integrity check. It never returns an error: when stored data
//! cannot be migrated the default document is returned and the cause is
//! carried in the report.

use crate::error::MigrationError;
use crate::integrity;
use crate::legacy;
use crate::options::MigrationOptions;
use crate::report::{AppliedStep, EntryPoint, MigrationReport};
use crate::shape::VersionedShape;
use crate::steps::{step_from, StepContext};
use fretlog_model::{Document, CURRENT_VERSION};
use fretlog_store::{KeyValueStore, LegacySnapshot, StorageKeys, StoreError};
use serde_json::Value;

/// Everything the engine reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStoredInput {
    /// Text under the unified key
    pub unified: Option<String>,
    /// Text under each legacy key
    pub legacy: LegacySnapshot,
}

impl RawStoredInput {
    /// Read the unified key and every legacy key
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub fn read<S: KeyValueStore + ?Sized>(store: &S, keys: &StorageKeys) -> Result<Self, StoreError> {
        Ok(Self {
            unified: store.get(&keys.unified)?,
            legacy: LegacySnapshot::read(store, &keys.legacy)?,
        })
    }

    /// Input holding only unified text
    #[must_use]
    pub fn unified(text: impl Into<String>) -> Self {
        Self {
            unified: Some(text.into()),
            legacy: LegacySnapshot::default(),
        }
    }

    /// Input holding only legacy keys
    #[must_use]
    pub fn legacy(legacy: LegacySnapshot) -> Self {
        Self {
            unified: None,
            legacy,
        }
    }
}

/// A current-version document and how it was produced
#[derive(Debug)]
pub struct MigrationOutcome {
    /// The migrated document
    pub document: Document,
    /// What was done
    pub report: MigrationReport,
}

/// Sequential migration engine
#[derive(Debug, Clone, Default)]
pub struct MigrationEngine {
    options: MigrationOptions,
}

impl MigrationEngine {
    /// Engine with the given options
    #[must_use]
    pub const fn new(options: MigrationOptions) -> Self {
        Self { options }
    }

    /// Options in use
    #[inline]
    #[must_use]
    pub const fn options(&self) -> &MigrationOptions {
        &self.options
    }

    /// Migrate stored input to the current version
    ///
    /// Entry point, in order: unified text (current or stale), any legacy
    /// key, nothing at all. Blank unified text counts as absent.
    pub fn migrate(&self, input: &RawStoredInput) -> MigrationOutcome {
        let unified = input
            .unified
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());

        if let Some(text) = unified {
            return match serde_json::from_str::<Value>(text) {
                Ok(value) => self.migrate_value(value, &input.legacy),
                Err(e) => self.fallback(MigrationReport::new(EntryPoint::Fallback), e.into()),
            };
        }

        if !input.legacy.is_empty() {
            tracing::info!(keys = input.legacy.present_count(), "migrating from legacy keys");
            let mut report = MigrationReport::new(EntryPoint::Legacy);
            let synthesized =
                legacy::synthesize(&input.legacy, &self.options.legacy_keys, &mut report);
            // Steps must not fold in the keys synthesis already consumed
            let remaining = LegacySnapshot {
                maintenance: None,
                humidity: None,
                inspection: None,
                ..input.legacy.clone()
            };
            return match VersionedShape::flat(2, synthesized) {
                Ok(shape) => self.finish(shape, &remaining, report),
                Err(e) => self.fallback(report, e),
            };
        }

        tracing::info!("no stored data; creating fresh document");
        let mut report = MigrationReport::new(EntryPoint::Fresh);
        let mut document = self.fresh_document();
        integrity::verify(&mut document, &self.options, &mut report);
        MigrationOutcome { document, report }
    }

    /// Migrate an already-parsed document
    ///
    /// Backup import passes an empty `legacy` so a foreign document never
    /// absorbs the live store's legacy keys.
    pub fn migrate_value(&self, value: Value, legacy: &LegacySnapshot) -> MigrationOutcome {
        let mut report = MigrationReport::new(EntryPoint::Current);
        match VersionedShape::parse(value, &mut report) {
            Ok(shape) => {
                let version = shape.version();
                if version < CURRENT_VERSION {
                    report.entry = EntryPoint::Stale { from: version };
                }
                tracing::info!(version, entry = %report.entry, "migrating stored document");
                self.finish(shape, legacy, report)
            }
            Err(e) => self.fallback(report, e),
        }
    }

    /// Migrate document text with no legacy context
    pub fn migrate_text(&self, text: &str) -> MigrationOutcome {
        self.migrate(&RawStoredInput::unified(text))
    }

    fn finish(
        &self,
        shape: VersionedShape,
        legacy: &LegacySnapshot,
        mut report: MigrationReport,
    ) -> MigrationOutcome {
        let ctx = StepContext {
            options: &self.options,
            legacy,
        };
        let result = run_chain(shape, &ctx, &mut report).and_then(|mut document| {
            integrity::verify(&mut document, &self.options, &mut report);
            document.validate()?;
            Ok(document)
        });
        match result {
            Ok(document) => MigrationOutcome { document, report },
            Err(e) => self.fallback(report, e),
        }
    }

    fn fallback(&self, mut report: MigrationReport, cause: MigrationError) -> MigrationOutcome {
        tracing::warn!(error = %cause, "stored data could not be migrated; using default document");
        report.entry = EntryPoint::Fallback;
        report.fallback = Some(cause);
        MigrationOutcome {
            document: self.fresh_document(),
            report,
        }
    }

    /// Default document for the configured catalog
    #[must_use]
    pub fn fresh_document(&self) -> Document {
        Document::fresh(&self.options.catalog, &self.options.default_instance)
    }
}

/// Apply steps strictly one version at a time
fn run_chain(
    mut shape: VersionedShape,
    ctx: &StepContext<'_>,
    report: &mut MigrationReport,
) -> Result<Document, MigrationError> {
    while shape.version() < CURRENT_VERSION {
        let from = shape.version();
        let step = step_from(from).ok_or(MigrationError::MissingStep(from))?;
        tracing::debug!(from, to = step.to, step = step.description, "applying migration step");
        shape = step.apply(shape, ctx, report)?;
        if shape.version() != step.to {
            return Err(MigrationError::StepMismatch {
                step: step.description,
                expected: step.to,
                found: shape.version(),
            });
        }
        report.steps.push(AppliedStep {
            from,
            to: step.to,
            description: step.description,
        });
    }
    match shape {
        VersionedShape::V6(document) => Ok(document),
        other => Err(MigrationError::StepMismatch {
            step: "final",
            expected: CURRENT_VERSION,
            found: other.version(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_input_is_fresh() {
        let outcome = MigrationEngine::default().migrate(&RawStoredInput::default());
        assert_eq!(outcome.report.entry, EntryPoint::Fresh);
        assert_eq!(outcome.document, Document::default());
        assert!(outcome.report.needs_persist());
    }

    #[test]
    fn blank_unified_text_counts_as_absent() {
        let outcome = MigrationEngine::default().migrate(&RawStoredInput::unified("  "));
        assert_eq!(outcome.report.entry, EntryPoint::Fresh);
    }

    #[test]
    fn invalid_json_falls_back_with_cause() {
        let outcome = MigrationEngine::default().migrate_text("{oops");
        assert!(outcome.report.is_fallback());
        assert!(matches!(outcome.report.fallback, Some(MigrationError::Parse(_))));
        assert!(!outcome.report.needs_persist());
        assert_eq!(outcome.document, Document::default());
    }

    #[test]
    fn future_version_falls_back_without_persisting() {
        let outcome = MigrationEngine::default().migrate_text(r#"{"version": 9}"#);
        assert!(outcome
            .report
            .fallback
            .as_ref()
            .is_some_and(MigrationError::is_future_data));
        assert!(!outcome.report.needs_persist());
    }

    #[test]
    fn stale_document_walks_every_later_step() {
        let outcome = MigrationEngine::default().migrate_text(r#"{"version": 3}"#);
        assert_eq!(outcome.report.entry, EntryPoint::Stale { from: 3 });
        assert_eq!(outcome.report.path(), vec![3, 4, 5, 6]);
        assert_eq!(outcome.document.version, CURRENT_VERSION);
    }

    #[test]
    fn current_document_is_returned_unchanged() {
        let doc = Document::default();
        let text = serde_json::to_string(&doc).unwrap();
        let outcome = MigrationEngine::default().migrate_text(&text);
        assert_eq!(outcome.report.entry, EntryPoint::Current);
        assert!(outcome.report.steps.is_empty());
        assert!(!outcome.report.needs_persist());
        assert_eq!(outcome.document, doc);
    }

    #[test]
    fn custom_default_instance_receives_history() {
        let engine = MigrationEngine::new(MigrationOptions::default().with_default_instance("dread"));
        let outcome = engine.migrate_text(
            &json!({"version": 5, "maintenanceStates": {"daily": [{"id": "daily-1", "completed": true}]}})
                .to_string(),
        );
        let doc = outcome.document;
        assert_eq!(doc.active_instance_id, "dread");
        let dread = &doc.instances["dread"];
        assert_eq!(
            dread.maintenance_states[&fretlog_model::TaskCategory::Daily][0].id,
            "dread-daily-1"
        );
        assert!(doc.instances.contains_key("gs-mini"));
    }
}
