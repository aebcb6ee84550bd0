//! Versioned accessor
//!
//! The read/write façade over the key-value store. Every read goes back to
//! the store and through the migration engine, so it observes the most
//! recent write; there is no cache to invalidate.

use crate::backup::BackupEnvelope;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use chrono::{DateTime, Utc};
use fretlog_migrate::{MigrationEngine, MigrationReport, RawStoredInput};
use fretlog_model::{Document, CURRENT_VERSION};
use fretlog_store::{KeyValueStore, StoreError};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// What happened to a migrated document on load
#[derive(Debug)]
pub enum PersistOutcome {
    /// Stored document was already current and whole
    Unchanged,
    /// Migrated document was written back
    Written,
    /// Stored data could not be migrated and was left in place
    Skipped,
    /// Write-back was refused; the returned document is still correct
    Failed(StoreError),
}

impl PersistOutcome {
    /// Whether the write-back was refused
    #[inline]
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A loaded document with its provenance
#[derive(Debug)]
pub struct Loaded {
    /// Current-version document
    pub document: Document,
    /// How it was produced
    pub report: MigrationReport,
    /// Whether it was written back
    pub persisted: PersistOutcome,
}

/// Read/write façade over a key-value store
#[derive(Debug)]
pub struct VersionedStore<S> {
    store: S,
    config: TrackerConfig,
    engine: MigrationEngine,
}

impl<S: KeyValueStore> VersionedStore<S> {
    /// Create accessor over `store`
    #[must_use]
    pub fn new(store: S, config: TrackerConfig) -> Self {
        let engine = MigrationEngine::new(config.migration_options());
        Self {
            store,
            config,
            engine,
        }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Migration engine in use
    #[inline]
    #[must_use]
    pub const fn engine(&self) -> &MigrationEngine {
        &self.engine
    }

    /// Migrate whatever is stored without writing anything back
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub fn read(&self) -> Result<(Document, MigrationReport), TrackerError> {
        let input = RawStoredInput::read(&self.store, &self.config.storage)?;
        let outcome = self.engine.migrate(&input);
        Ok((outcome.document, outcome.report))
    }

    /// Load the current document, writing back a migrated result
    ///
    /// A refused write-back is reported in [`Loaded::persisted`], not
    /// returned as an error. A fallback document is never written, so the
    /// unreadable stored text stays where it is.
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub fn load(&self) -> Result<Loaded, TrackerError> {
        let (mut document, report) = self.read()?;
        let persisted = if report.is_fallback() {
            tracing::warn!(report = %report, "stored data left in place after fallback");
            PersistOutcome::Skipped
        } else if report.needs_persist() {
            match self.write(&mut document) {
                Ok(()) => PersistOutcome::Written,
                Err(e) => {
                    tracing::error!(error = %e, "migrated document could not be saved");
                    PersistOutcome::Failed(e)
                }
            }
        } else {
            PersistOutcome::Unchanged
        };
        Ok(Loaded {
            document,
            report,
            persisted,
        })
    }

    /// Current-version document
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub fn get_document(&self) -> Result<Document, TrackerError> {
        Ok(self.load()?.document)
    }

    /// One field, or `default` when absent
    ///
    /// Top-level fields are looked up first, then the same field on the
    /// active instance. A value of the wrong type also yields `default`.
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub fn get_field<T: DeserializeOwned>(&self, name: &str, default: T) -> Result<T, TrackerError> {
        let document = self.get_document()?;
        let Some(value) = document.resolve_field(name)? else {
            return Ok(default);
        };
        match serde_json::from_value(value) {
            Ok(field) => Ok(field),
            Err(e) => {
                tracing::warn!(field = name, error = %e, "field has unexpected type; using default");
                Ok(default)
            }
        }
    }

    /// Stamp the current version onto `document` and persist it in one write
    ///
    /// # Errors
    /// Returns error if the store refuses the write; `document` is still
    /// stamped and correct
    pub fn set_document(&self, document: &mut Document) -> Result<(), TrackerError> {
        self.write(document).map_err(|e| {
            tracing::error!(error = %e, "document could not be saved");
            TrackerError::from(e)
        })
    }

    fn write(&self, document: &mut Document) -> Result<(), StoreError> {
        document.version = CURRENT_VERSION;
        let text = serde_json::to_string(document)
            .map_err(|e| StoreError::write(&self.config.storage.unified, e.to_string()))?;
        self.store.set(&self.config.storage.unified, &text)?;
        tracing::debug!(bytes = text.len(), "document saved");
        Ok(())
    }

    /// Replace one field and persist the whole document
    ///
    /// The field is written where [`get_field`](Self::get_field) would find
    /// it: at top level when the document has it there, otherwise on the
    /// active instance when the instance has it, otherwise at top level.
    ///
    /// # Errors
    /// Returns error if the value does not fit the field or the write fails
    pub fn update_field(&self, name: &str, value: Value) -> Result<Document, TrackerError> {
        let document = self.get_document()?;
        let mut top = into_object(serde_json::to_value(&document)?)?;

        let active = document.active_instance_id.clone();
        let on_instance = !top.contains_key(name)
            && top
                .get("guitars")
                .and_then(|instances| instances.get(&active))
                .and_then(Value::as_object)
                .is_some_and(|fields| fields.contains_key(name));
        if on_instance {
            if let Some(Value::Object(fields)) = top
                .get_mut("guitars")
                .and_then(|instances| instances.get_mut(&active))
            {
                fields.insert(name.to_string(), value);
            }
        } else {
            top.insert(name.to_string(), value);
        }

        let mut updated: Document =
            serde_json::from_value(Value::Object(top)).map_err(|source| TrackerError::InvalidField {
                name: name.to_string(),
                source,
            })?;
        updated.validate()?;
        self.set_document(&mut updated)?;
        tracing::info!(field = name, on_instance, "field updated");
        Ok(updated)
    }

    /// Export the current document as a backup envelope
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub fn export(&self, at: DateTime<Utc>) -> Result<BackupEnvelope, TrackerError> {
        Ok(BackupEnvelope::new(self.get_document()?, at))
    }

    /// Clear every persisted entry, legacy keys included
    ///
    /// # Errors
    /// Returns error if the store cannot be cleared
    pub fn reset(&self) -> Result<(), TrackerError> {
        self.store.clear()?;
        tracing::warn!("all stored data cleared");
        Ok(())
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>, TrackerError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(TrackerError::Serialization(serde::ser::Error::custom(format!(
            "document serialized to {other} instead of an object"
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fretlog_migrate::EntryPoint;
    use fretlog_store::MemoryStore;
    use fretlog_test_utils::{legacy_store, v5_document, GS_MINI, PRS};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn accessor(store: MemoryStore) -> VersionedStore<MemoryStore> {
        VersionedStore::new(store, TrackerConfig::default())
    }

    #[test]
    fn first_load_migrates_and_persists_once() {
        let tracker = accessor(legacy_store());
        let first = tracker.load().unwrap();
        assert_eq!(first.report.entry, EntryPoint::Legacy);
        assert!(matches!(first.persisted, PersistOutcome::Written));

        let second = tracker.load().unwrap();
        assert_eq!(second.report.entry, EntryPoint::Current);
        assert!(matches!(second.persisted, PersistOutcome::Unchanged));
        assert_eq!(second.document, first.document);
    }

    #[test]
    fn legacy_keys_are_left_in_place() {
        let store = legacy_store();
        let before = store.snapshot();
        let tracker = accessor(store);
        tracker.load().unwrap();
        let after = tracker.store().snapshot();
        for (key, value) in before {
            assert_eq!(after.get(&key), Some(&value));
        }
        assert!(after.contains_key("guitarTrackerData"));
    }

    #[test]
    fn fallback_does_not_overwrite_stored_text() {
        let store = MemoryStore::new();
        store.set("guitarTrackerData", "{not json").unwrap();
        let tracker = accessor(store);
        let loaded = tracker.load().unwrap();
        assert!(loaded.report.is_fallback());
        assert!(matches!(loaded.persisted, PersistOutcome::Skipped));
        assert_eq!(
            tracker.store().get("guitarTrackerData").unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn refused_write_back_still_returns_document() {
        let store = MemoryStore::with_entries([("guitarTrackerData", v5_document().to_string())])
            .with_quota(64);
        let tracker = accessor(store);
        let loaded = tracker.load().unwrap();
        assert!(loaded.persisted.is_failure());
        assert_eq!(loaded.document.instances[GS_MINI].humidity_readings.len(), 2);
    }

    #[test]
    fn reads_observe_latest_write() {
        let tracker = accessor(MemoryStore::new());
        let mut doc = tracker.get_document().unwrap();
        doc.set_active_instance(PRS).unwrap();
        doc.version = 2;
        tracker.set_document(&mut doc).unwrap();
        assert_eq!(doc.version, CURRENT_VERSION);
        assert_eq!(tracker.get_document().unwrap(), doc);
        assert_eq!(
            tracker.get_field("activeGuitarId", String::new()).unwrap(),
            PRS
        );
    }

    #[test]
    fn get_field_falls_back_to_active_instance_then_default() {
        let tracker = accessor(MemoryStore::new());
        assert_eq!(tracker.get_field("playingFrequency", String::new()).unwrap(), "weekly");
        assert!(!tracker.get_field("onboardingComplete", true).unwrap());
        assert_eq!(tracker.get_field("hasHygrometer", true).unwrap(), true);
        assert_eq!(tracker.get_field("nothingHere", 7_u32).unwrap(), 7);
        assert_eq!(tracker.get_field("activeGuitarId", 0_u32).unwrap(), 0);
    }

    #[test]
    fn update_field_targets_where_the_field_lives() {
        let tracker = accessor(MemoryStore::new());
        let doc = tracker.update_field("onboardingComplete", json!(true)).unwrap();
        assert!(doc.instances[GS_MINI].onboarding_complete);
        assert!(!doc.extra.contains_key("onboardingComplete"));

        let doc = tracker.update_field("theme", json!("dark")).unwrap();
        assert_eq!(doc.extra["theme"], json!("dark"));
        assert_eq!(tracker.get_field("theme", String::new()).unwrap(), "dark");

        let err = tracker.update_field("playingSessions", json!("lots")).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidField { .. }));
        let err = tracker.update_field("activeGuitarId", json!("gone")).unwrap_err();
        assert!(matches!(err, TrackerError::Model(_)));
    }

    #[test]
    fn non_object_document_is_a_serialization_error() {
        let err = into_object(json!([1])).unwrap_err();
        assert!(matches!(err, TrackerError::Serialization(_)));
        assert!(!err.is_recoverable());
        assert!(into_object(json!({"version": 6})).is_ok());
    }

    #[test]
    fn reset_clears_everything() {
        let tracker = accessor(legacy_store());
        tracker.load().unwrap();
        tracker.reset().unwrap();
        assert!(tracker.store().is_empty());
        assert_eq!(tracker.load().unwrap().report.entry, EntryPoint::Fresh);
    }
}
