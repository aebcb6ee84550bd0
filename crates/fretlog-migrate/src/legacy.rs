//! Reading pre-consolidation keys
//!
//! Legacy keys are never modified or removed here. Anything that cannot be
//! read is reported and set aside into the synthesized document, since a
//! legacy-shaped backup file may be its only copy.

use crate::error::MigrationWarning;
use crate::lenient::{sift, SetAside, HISTORY_FIELDS};
use crate::remap::normalize_six_week;
use crate::report::MigrationReport;
use crate::shape::FlatDocument;
use fretlog_model::{HumidityReading, PlayingSession, StringChange, TaskTable};
use fretlog_store::{LegacyKeys, LegacySnapshot};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Readings synthesized from the pre-versioning key are tagged with this instance
pub const LEGACY_READING_TAG: &str = "default";

/// Report an unreadable key and keep its raw text
fn unreadable(
    key: &str,
    raw: Value,
    reason: String,
    set_aside: &mut SetAside,
    report: &mut MigrationReport,
) {
    report.warn(MigrationWarning::UnreadableLegacyKey {
        key: key.to_string(),
        reason,
    });
    set_aside.push(key, raw);
}

fn parse_json(
    text: &str,
    key: &str,
    set_aside: &mut SetAside,
    report: &mut MigrationReport,
) -> Option<Value> {
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            unreadable(key, Value::from(text), e.to_string(), set_aside, report);
            None
        }
    }
}

/// Run one legacy value through the history-field checks
///
/// Warnings name the document field the value feeds, not the storage key.
fn sifted<T: DeserializeOwned>(
    field: &'static str,
    value: Value,
    key: &str,
    set_aside: &mut SetAside,
    report: &mut MigrationReport,
) -> Option<T> {
    let mut map = Map::new();
    map.insert(field.to_string(), value);
    sift(&mut map, HISTORY_FIELDS, "", set_aside, report);
    let value = map.remove(field)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            unreadable(key, value, e.to_string(), set_aside, report);
            None
        }
    }
}

/// Legacy task table with six-week names normalized to eight-week
pub(crate) fn task_table(
    legacy: &LegacySnapshot,
    keys: &LegacyKeys,
    set_aside: &mut SetAside,
    report: &mut MigrationReport,
) -> Option<TaskTable> {
    let value = parse_json(legacy.maintenance.as_deref()?, &keys.maintenance, set_aside, report)?;
    let table: TaskTable = sifted("maintenanceStates", value, &keys.maintenance, set_aside, report)?;
    Some(normalize_six_week(table))
}

/// Legacy readings, optionally tagged with [`LEGACY_READING_TAG`]
pub(crate) fn readings(
    legacy: &LegacySnapshot,
    keys: &LegacyKeys,
    tag: bool,
    set_aside: &mut SetAside,
    report: &mut MigrationReport,
) -> Option<Vec<HumidityReading>> {
    let mut value = parse_json(legacy.humidity.as_deref()?, &keys.humidity, set_aside, report)?;
    if tag {
        if let Value::Array(items) = &mut value {
            for item in items.iter_mut().filter_map(Value::as_object_mut) {
                item.entry("guitarId")
                    .or_insert_with(|| Value::from(LEGACY_READING_TAG));
            }
        }
    }
    sifted("humidityReadings", value, &keys.humidity, set_aside, report)
}

/// Legacy inspection answers
pub(crate) fn inspection(
    legacy: &LegacySnapshot,
    keys: &LegacyKeys,
    set_aside: &mut SetAside,
    report: &mut MigrationReport,
) -> Option<Map<String, Value>> {
    match parse_json(legacy.inspection.as_deref()?, &keys.inspection, set_aside, report)? {
        Value::Object(map) => Some(map),
        other => {
            let reason = format!("expected an object, found {other}");
            unreadable(&keys.inspection, other, reason, set_aside, report);
            None
        }
    }
}

/// Legacy session array
pub(crate) fn sessions(
    legacy: &LegacySnapshot,
    keys: &LegacyKeys,
    set_aside: &mut SetAside,
    report: &mut MigrationReport,
) -> Option<Vec<PlayingSession>> {
    let value = parse_json(
        legacy.playing_sessions.as_deref()?,
        &keys.playing_sessions,
        set_aside,
        report,
    )?;
    sifted("playingSessions", value, &keys.playing_sessions, set_aside, report)
}

/// Legacy string change array
pub(crate) fn string_changes(
    legacy: &LegacySnapshot,
    keys: &LegacyKeys,
    set_aside: &mut SetAside,
    report: &mut MigrationReport,
) -> Option<Vec<StringChange>> {
    let value = parse_json(
        legacy.string_change_history.as_deref()?,
        &keys.string_change_history,
        set_aside,
        report,
    )?;
    sifted("stringChangeHistory", value, &keys.string_change_history, set_aside, report)
}

/// `"true"` / `"false"` flag; anything else reads as unknown
pub(crate) fn flag(text: Option<&str>) -> Option<bool> {
    match text.map(str::trim) {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

/// Decimal hours
pub(crate) fn hours(
    legacy: &LegacySnapshot,
    keys: &LegacyKeys,
    set_aside: &mut SetAside,
    report: &mut MigrationReport,
) -> Option<f64> {
    let text = legacy.playing_hours_per_week.as_deref()?;
    match text.trim().parse::<f64>() {
        Ok(hours) if hours.is_finite() => Some(hours),
        _ => {
            let reason = format!("`{text}` is not a number");
            unreadable(&keys.playing_hours_per_week, Value::from(text), reason, set_aside, report);
            None
        }
    }
}

/// Build a v2 flat document from the pre-versioning keys
///
/// Six-week tasks become eight-week tasks, missing completion fields read
/// as unchecked, and readings are tagged with [`LEGACY_READING_TAG`].
/// Anything unreadable is kept under the document's `unmigrated` key.
pub(crate) fn synthesize(
    legacy: &LegacySnapshot,
    keys: &LegacyKeys,
    report: &mut MigrationReport,
) -> FlatDocument {
    let mut doc = FlatDocument::at_version(2);
    let mut set_aside = SetAside::default();
    doc.maintenance_states = task_table(legacy, keys, &mut set_aside, report);
    doc.humidity_readings = readings(legacy, keys, true, &mut set_aside, report);
    doc.inspection_data = inspection(legacy, keys, &mut set_aside, report);
    set_aside.stash_into(&mut doc.extra);
    tracing::info!(
        tasks = doc.maintenance_states.as_ref().map_or(0, |t| t.values().map(Vec::len).sum()),
        readings = doc.humidity_readings.as_ref().map_or(0, Vec::len),
        "synthesized document from legacy keys"
    );
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::EntryPoint;
    use fretlog_model::{TaskCategory, Timestamp, UNMIGRATED_KEY};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn snapshot() -> LegacySnapshot {
        LegacySnapshot {
            maintenance: Some(
                r#"{"sixweek":[{"id":"6w-8","completed":true,"lastCompleted":"2024-01-05T00:00:00.000Z","name":"Change strings"}],
                    "daily":[{"id":"daily-1"}]}"#
                    .to_string(),
            ),
            humidity: Some(
                r#"[{"id":1,"timestamp":"2024-01-01T10:00:00Z","humidity":44},
                    {"id":2,"timestamp":"2024-01-02T10:00:00Z","humidity":46,"guitarId":"gs-mini"}]"#
                    .to_string(),
            ),
            inspection: Some(r#"{"neck":"straight"}"#.to_string()),
            ..LegacySnapshot::default()
        }
    }

    #[test]
    fn synthesis_normalizes_tasks_and_tags_readings() {
        let mut report = MigrationReport::new(EntryPoint::Legacy);
        let doc = synthesize(&snapshot(), &LegacyKeys::default(), &mut report);
        assert_eq!(doc.version, 2);
        let table = doc.maintenance_states.unwrap();
        let string_task = &table[&TaskCategory::EightWeek][0];
        assert_eq!(string_task.id, "8w-8");
        assert!(string_task.completed);
        assert_eq!(
            string_task.last_completed,
            Some(Timestamp::Text("2024-01-05T00:00:00.000Z".into()))
        );
        assert_eq!(string_task.extra["name"], Value::from("Change strings"));
        let daily = &table[&TaskCategory::Daily][0];
        assert!(!daily.completed);
        assert!(daily.last_completed.is_none());

        let readings = doc.humidity_readings.unwrap();
        assert_eq!(readings[0].extra["guitarId"], Value::from("default"));
        assert_eq!(readings[1].extra["guitarId"], Value::from("gs-mini"));
        assert_eq!(doc.inspection_data.unwrap()["neck"], Value::from("straight"));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn unreadable_keys_are_reported_not_fatal() {
        let legacy = LegacySnapshot {
            maintenance: Some("{not json".into()),
            inspection: Some("[1]".into()),
            playing_hours_per_week: Some("lots".into()),
            ..LegacySnapshot::default()
        };
        let keys = LegacyKeys::default();
        let mut report = MigrationReport::new(EntryPoint::Legacy);
        let doc = synthesize(&legacy, &keys, &mut report);
        assert!(doc.maintenance_states.is_none());
        assert!(doc.inspection_data.is_none());
        let stash = &doc.extra[UNMIGRATED_KEY];
        assert_eq!(stash["guitarMaintenanceData"], json!(["{not json"]));
        assert_eq!(stash["inspectionData"], json!([[1]]));

        let mut set_aside = SetAside::default();
        assert_eq!(hours(&legacy, &keys, &mut set_aside, &mut report), None);
        assert!(!set_aside.is_empty());
        assert_eq!(report.warnings.len(), 3);
    }

    #[test]
    fn malformed_legacy_records_are_kept_in_the_document() {
        let legacy = LegacySnapshot {
            humidity: Some(
                r#"[{"id":1,"timestamp":"2024-01-01T10:00:00Z","humidity":44},
                    {"id":2,"timestamp":"2024-01-02T10:00:00Z","humidity":"47%"}]"#
                    .to_string(),
            ),
            ..LegacySnapshot::default()
        };
        let mut report = MigrationReport::new(EntryPoint::Legacy);
        let doc = synthesize(&legacy, &LegacyKeys::default(), &mut report);
        assert_eq!(doc.humidity_readings.unwrap().len(), 1);
        assert_eq!(
            doc.extra[UNMIGRATED_KEY]["humidityReadings"][0]["humidity"],
            json!("47%")
        );
        assert!(matches!(
            report.warnings.as_slice(),
            [MigrationWarning::UnrecognizedRecord { field, index: 1, .. }] if field == "humidityReadings"
        ));
    }

    #[test]
    fn flags_parse_strictly() {
        assert_eq!(flag(Some("true")), Some(true));
        assert_eq!(flag(Some("false")), Some(false));
        assert_eq!(flag(Some("yes")), None);
        assert_eq!(flag(None), None);
    }
}
