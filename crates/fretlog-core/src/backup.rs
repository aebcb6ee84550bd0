//! Backup files
//!
//! Export wraps the current document in an envelope. Import accepts that
//! envelope and every older shape a backup could have been written in,
//! then brings it to the current version on its own, without consulting
//! the live store.

use crate::error::{BackupError, TrackerError};
use chrono::{DateTime, SecondsFormat, Utc};
use fretlog_migrate::{MigrationEngine, MigrationReport, RawStoredInput};
use fretlog_model::Document;
use fretlog_store::LegacySnapshot;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File name suggested for exports
pub const DEFAULT_BACKUP_FILE: &str = "guitar-maintenance-backup.json";

/// Exported backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEnvelope {
    /// When the export was taken (RFC 3339)
    pub export_date: String,
    /// Version of `data`
    pub version: u32,
    /// The exported document
    pub data: Document,
}

impl BackupEnvelope {
    /// Envelope around `document`, taken at `at`
    #[must_use]
    pub fn new(document: Document, at: DateTime<Utc>) -> Self {
        Self {
            export_date: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            version: document.version,
            data: document,
        }
    }

    /// Indented JSON text
    ///
    /// # Errors
    /// Returns error if the document cannot be serialized
    pub fn to_json_pretty(&self) -> Result<String, TrackerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A parsed backup, classified by its top-level shape
#[derive(Debug, Clone, PartialEq)]
pub enum BackupPayload {
    /// `{exportDate, version, data}`
    Envelope {
        /// Export time, when recorded
        export_date: Option<String>,
        /// Wrapped document, any version
        data: Value,
    },
    /// Current unified document (`guitars` object)
    Document(Value),
    /// Wrapper holding a versioned document under `versionedData`
    VersionedData(Value),
    /// Task-table export: `{exportDate, version: 1, tasks, humidity}`
    LegacyTasks {
        /// Task table by category
        tasks: Value,
        /// Reading array
        humidity: Option<Value>,
    },
    /// Full pre-consolidation export: `{maintenance, humidity, inspections}`
    LegacyExport {
        /// Task table by category
        maintenance: Value,
        /// Reading array
        humidity: Option<Value>,
        /// Inspection answers
        inspections: Option<Value>,
    },
    /// Flat document carrying only a version tag
    FlatDocument(Value),
}

impl BackupPayload {
    /// Parse backup text
    ///
    /// # Errors
    /// Returns error if the text is not JSON or matches no known shape
    pub fn parse(text: &str) -> Result<Self, BackupError> {
        let value: Value = serde_json::from_str(text).map_err(BackupError::Parse)?;
        Self::from_value(value)
    }

    /// Classify a parsed backup
    ///
    /// # Errors
    /// Returns error if the value matches no known shape
    pub fn from_value(value: Value) -> Result<Self, BackupError> {
        let Value::Object(mut top) = value else {
            return Err(BackupError::unrecognized("top level is not an object"));
        };

        if is_object(&top, "data") {
            let export_date = top.get("exportDate").and_then(Value::as_str).map(str::to_string);
            return Ok(Self::Envelope {
                export_date,
                data: take(&mut top, "data"),
            });
        }
        if is_object(&top, "guitars") {
            return Ok(Self::Document(Value::Object(top)));
        }
        if is_object(&top, "versionedData") {
            return Ok(Self::VersionedData(take(&mut top, "versionedData")));
        }
        if is_object(&top, "tasks") {
            return Ok(Self::LegacyTasks {
                tasks: take(&mut top, "tasks"),
                humidity: take_array(&mut top, "humidity"),
            });
        }
        if is_object(&top, "maintenance") {
            let inspections = top
                .remove("inspections")
                .filter(Value::is_object);
            return Ok(Self::LegacyExport {
                maintenance: take(&mut top, "maintenance"),
                humidity: take_array(&mut top, "humidity"),
                inspections,
            });
        }
        if top.contains_key("version") {
            return Ok(Self::FlatDocument(Value::Object(top)));
        }
        Err(BackupError::unrecognized(
            "expected one of data, guitars, versionedData, tasks, maintenance or version",
        ))
    }

    /// Short name of the recognized shape
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Envelope { .. } => "export envelope",
            Self::Document(_) => "current document",
            Self::VersionedData(_) => "versioned data wrapper",
            Self::LegacyTasks { .. } => "legacy task export",
            Self::LegacyExport { .. } => "legacy full export",
            Self::FlatDocument(_) => "flat versioned document",
        }
    }

    /// Bring the backup to the current version
    ///
    /// # Errors
    /// Returns error if the backup cannot be migrated; the default document
    /// is never substituted
    pub fn into_document(
        self,
        engine: &MigrationEngine,
    ) -> Result<(Document, MigrationReport), BackupError> {
        let kind = self.kind();
        let mut outcome = match self {
            Self::Envelope { data: value, .. }
            | Self::Document(value)
            | Self::VersionedData(value)
            | Self::FlatDocument(value) => engine.migrate_value(value, &LegacySnapshot::default()),
            Self::LegacyTasks { tasks, humidity } => {
                engine.migrate(&RawStoredInput::legacy(LegacySnapshot {
                    maintenance: Some(tasks.to_string()),
                    humidity: humidity.map(|v| v.to_string()),
                    ..LegacySnapshot::default()
                }))
            }
            Self::LegacyExport {
                maintenance,
                humidity,
                inspections,
            } => engine.migrate(&RawStoredInput::legacy(LegacySnapshot {
                maintenance: Some(maintenance.to_string()),
                humidity: humidity.map(|v| v.to_string()),
                inspection: inspections.map(|v| v.to_string()),
                ..LegacySnapshot::default()
            })),
        };

        if let Some(cause) = outcome.report.fallback.take() {
            return Err(BackupError::Unmigratable(cause));
        }
        tracing::debug!(kind, entry = %outcome.report.entry, "backup migrated");
        Ok((outcome.document, outcome.report))
    }
}

fn is_object(top: &Map<String, Value>, key: &str) -> bool {
    top.get(key).is_some_and(Value::is_object)
}

fn take(top: &mut Map<String, Value>, key: &str) -> Value {
    top.remove(key).unwrap_or(Value::Null)
}

fn take_array(top: &mut Map<String, Value>, key: &str) -> Option<Value> {
    top.remove(key).filter(Value::is_array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fretlog_migrate::EntryPoint;
    use fretlog_model::{TaskCategory, CURRENT_VERSION};
    use fretlog_test_utils::{instant, legacy_six_week_table, v2_document, v5_document, GS_MINI};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn classify(value: Value) -> &'static str {
        BackupPayload::from_value(value).unwrap().kind()
    }

    #[test]
    fn recognizes_every_shape_in_order() {
        let envelope = BackupEnvelope::new(Document::default(), instant(2024, 5, 1, 12));
        assert_eq!(classify(serde_json::to_value(&envelope).unwrap()), "export envelope");
        assert_eq!(
            classify(serde_json::to_value(Document::default()).unwrap()),
            "current document"
        );
        assert_eq!(classify(json!({"versionedData": v2_document()})), "versioned data wrapper");
        assert_eq!(
            classify(json!({"exportDate": "x", "version": 1, "tasks": {}, "humidity": []})),
            "legacy task export"
        );
        assert_eq!(classify(json!({"maintenance": {}, "inspections": {}})), "legacy full export");
        assert_eq!(classify(v5_document()), "flat versioned document");
    }

    #[test]
    fn unrecognized_input_is_rejected() {
        assert!(matches!(BackupPayload::parse("[1, 2]"), Err(BackupError::UnrecognizedShape(_))));
        assert!(matches!(
            BackupPayload::parse(r#"{"hello": "world"}"#),
            Err(BackupError::UnrecognizedShape(_))
        ));
        assert!(matches!(BackupPayload::parse("{oops"), Err(BackupError::Parse(_))));
    }

    #[test]
    fn export_round_trips_through_import() {
        let envelope = BackupEnvelope::new(Document::default(), instant(2024, 5, 1, 12));
        assert_eq!(envelope.export_date, "2024-05-01T12:00:00.000Z");
        let text = envelope.to_json_pretty().unwrap();
        let (doc, report) = BackupPayload::parse(&text)
            .unwrap()
            .into_document(&MigrationEngine::default())
            .unwrap();
        assert_eq!(report.entry, EntryPoint::Current);
        assert_eq!(doc, Document::default());
    }

    #[test]
    fn legacy_task_export_is_migrated_alone() {
        let text = json!({
            "exportDate": "2024-01-11T00:00:00.000Z",
            "version": 1,
            "tasks": legacy_six_week_table(),
            "humidity": [{"id": 1, "timestamp": "2024-01-01T10:00:00.000Z", "humidity": 44}]
        })
        .to_string();
        let (doc, report) = BackupPayload::parse(&text)
            .unwrap()
            .into_document(&MigrationEngine::default())
            .unwrap();
        assert_eq!(report.entry, EntryPoint::Legacy);
        assert_eq!(doc.version, CURRENT_VERSION);
        let gs = &doc.instances[GS_MINI];
        assert_eq!(gs.humidity_readings.len(), 1);
        assert!(gs.maintenance_states[&TaskCategory::EightWeek]
            .iter()
            .any(|t| t.id == "gs-mini-string-8" && t.completed));
        assert!(!gs.onboarding_complete);
    }

    #[test]
    fn legacy_full_export_carries_inspections() {
        let text = json!({
            "exportDate": "2024-01-11T00:00:00.000Z",
            "version": "1.0",
            "maintenance": legacy_six_week_table(),
            "inspections": {"frets": "level"}
        })
        .to_string();
        let (doc, _) = BackupPayload::parse(&text)
            .unwrap()
            .into_document(&MigrationEngine::default())
            .unwrap();
        assert_eq!(doc.inspection_data["frets"], json!("level"));
    }

    #[test]
    fn unmigratable_backup_is_rejected_not_defaulted() {
        let err = BackupPayload::parse(r#"{"version": 42}"#)
            .unwrap()
            .into_document(&MigrationEngine::default())
            .unwrap_err();
        assert!(matches!(err, BackupError::Unmigratable(ref cause) if cause.is_future_data()));
    }
}
