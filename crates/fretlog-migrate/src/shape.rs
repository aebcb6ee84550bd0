//! Per-version document shapes
//!
//! Versions 1 through 5 share one flat layout in which a single implicit
//! instance's history sits at the top level; fields were only ever added,
//! so [`FlatDocument`] models them all with optional fields. Version 6 is
//! the current [`Document`]. [`VersionedShape`] tags a parsed document with
//! its version so the step table can dispatch on a single discriminant.

use crate::error::{MigrationError, MigrationWarning};
use crate::integrity::note_missing_collections;
use crate::lenient::{
    canonicalize_key, sift, SetAside, DOCUMENT_FIELDS, FLAT_FIELDS, HISTORY_FIELDS,
    INSTANCE_FIELDS,
};
use crate::report::MigrationReport;
use fretlog_model::{
    Document, HumidityReading, Inventory, PlayingSession, StringChange, TaskTable, TimerState,
    Timestamp, CURRENT_VERSION,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Versions 1 through 5
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatDocument {
    /// Version tag
    #[serde(default)]
    pub version: u32,
    /// Task table
    pub maintenance_states: Option<TaskTable>,
    /// Hygrometer readings
    pub humidity_readings: Option<Vec<HumidityReading>>,
    /// Practice sessions (v3+)
    pub playing_sessions: Option<Vec<PlayingSession>>,
    /// String changes (v3+)
    pub string_change_history: Option<Vec<StringChange>>,
    /// Inspection answers
    pub inspection_data: Option<Map<String, Value>>,
    /// Onboarding flag (v3+)
    pub onboarding_complete: Option<bool>,
    /// Playing frequency (v3+)
    pub playing_frequency: Option<String>,
    /// Playing hours (v3+)
    pub playing_hours_per_week: Option<f64>,
    /// Hygrometer flag (v3+)
    pub has_hygrometer: Option<bool>,
    /// Strings fitted (v3+)
    pub current_string_type: Option<String>,
    /// Last string change (v3+)
    pub last_string_change_date: Option<Timestamp>,
    /// Practice stopwatch (v4+)
    pub timer_state: Option<TimerState>,
    /// Practice entries (v4+)
    pub practice_history: Option<Vec<Value>>,
    /// Consumables (v4+)
    pub inventory: Option<Inventory>,
    /// Single-instance profile array; only `[0].settings` is read
    pub guitars: Option<Vec<Value>>,

    /// Fields no step interprets
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FlatDocument {
    /// Empty document at `version`
    #[must_use]
    pub fn at_version(version: u32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }
}

/// A parsed document tagged with its shape version
#[derive(Debug, Clone, PartialEq)]
pub enum VersionedShape {
    /// Unversioned or tagged 1
    V1(FlatDocument),
    /// Re-tagged v1
    V2(FlatDocument),
    /// Feature keys consolidated
    V3(FlatDocument),
    /// Stopwatch, practice history and inventory
    V4(FlatDocument),
    /// Legacy readings and tasks consolidated
    V5(FlatDocument),
    /// Multi-instance
    V6(Document),
}

impl VersionedShape {
    /// Discriminant
    #[must_use]
    pub const fn version(&self) -> u32 {
        match self {
            Self::V1(_) => 1,
            Self::V2(_) => 2,
            Self::V3(_) => 3,
            Self::V4(_) => 4,
            Self::V5(_) => 5,
            Self::V6(_) => 6,
        }
    }

    /// Tag a flat document; its `version` field is overwritten to match
    ///
    /// # Errors
    /// Returns error if `version` is not a flat version
    pub fn flat(version: u32, mut doc: FlatDocument) -> Result<Self, MigrationError> {
        doc.version = version;
        Ok(match version {
            1 => Self::V1(doc),
            2 => Self::V2(doc),
            3 => Self::V3(doc),
            4 => Self::V4(doc),
            5 => Self::V5(doc),
            other => {
                return Err(MigrationError::unrecognized(format!(
                    "version {other} has no flat shape"
                )))
            }
        })
    }

    /// Take the flat body if this is `version`
    ///
    /// # Errors
    /// Returns error if the shape is a different version
    pub fn into_flat(self, version: u32, step: &'static str) -> Result<FlatDocument, MigrationError> {
        let found = self.version();
        match self {
            Self::V1(doc) | Self::V2(doc) | Self::V3(doc) | Self::V4(doc) | Self::V5(doc)
                if found == version =>
            {
                Ok(doc)
            }
            _ => Err(MigrationError::StepMismatch {
                step,
                expected: version,
                found,
            }),
        }
    }

    /// Parse stored JSON, recovering malformed fields into the report
    ///
    /// A missing, `null` or zero version tag reads as version 1.
    ///
    /// # Errors
    /// Returns error if the value is not an object, the tag is not an
    /// integer, or the tag is newer than [`CURRENT_VERSION`]
    pub fn parse(value: Value, report: &mut MigrationReport) -> Result<Self, MigrationError> {
        let Value::Object(mut map) = value else {
            return Err(MigrationError::unrecognized("document is not a JSON object"));
        };
        let version = read_version(&map)?;
        if version == CURRENT_VERSION {
            return Ok(Self::V6(parse_current(map, report)?));
        }
        map.remove("version");
        let mut set_aside = SetAside::default();
        sift(&mut map, HISTORY_FIELDS, "", &mut set_aside, report);
        sift(&mut map, FLAT_FIELDS, "", &mut set_aside, report);
        set_aside.stash_into(&mut map);
        let doc: FlatDocument = serde_json::from_value(Value::Object(map))?;
        Self::flat(version, doc)
    }
}

fn read_version(map: &Map<String, Value>) -> Result<u32, MigrationError> {
    let found = match map.get("version") {
        None | Some(Value::Null) => return Ok(1),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
            MigrationError::unrecognized(format!("version tag {n} is not a whole number"))
        })?,
        Some(other) => {
            return Err(MigrationError::unrecognized(format!(
                "version tag {other} is not a number"
            )))
        }
    };
    if found == 0 {
        return Ok(1);
    }
    match u32::try_from(found) {
        Ok(version) if version <= CURRENT_VERSION => Ok(version),
        _ => Err(MigrationError::FutureVersion {
            found,
            supported: CURRENT_VERSION,
        }),
    }
}

/// Parse a current-version document, recovering per instance
fn parse_current(
    mut map: Map<String, Value>,
    report: &mut MigrationReport,
) -> Result<Document, MigrationError> {
    canonicalize_key(&mut map, "equipmentInstances", "guitars");
    canonicalize_key(&mut map, "activeInstanceId", "activeGuitarId");
    canonicalize_key(&mut map, "pendingSyncQueue", "syncQueue");
    note_missing_collections(&map, report);

    let mut set_aside = SetAside::default();
    sift(&mut map, DOCUMENT_FIELDS, "", &mut set_aside, report);

    let instances = match map.remove("guitars") {
        Some(Value::Object(instances)) => instances,
        None | Some(Value::Null) => Map::new(),
        Some(other) => {
            report.warn(MigrationWarning::UnrecognizedField {
                field: "guitars".to_string(),
                reason: "expected an object of instances".to_string(),
            });
            set_aside.push("guitars", other);
            Map::new()
        }
    };
    let mut kept = Map::new();
    for (id, instance) in instances {
        let scope = format!("guitars.{id}");
        let Value::Object(mut fields) = instance else {
            report.warn(MigrationWarning::UnrecognizedField {
                field: scope,
                reason: "expected an instance object".to_string(),
            });
            set_aside.push(&format!("guitars.{id}"), instance);
            continue;
        };
        let mut instance_aside = SetAside::default();
        sift(&mut fields, INSTANCE_FIELDS, &scope, &mut instance_aside, report);
        sift(&mut fields, HISTORY_FIELDS, &scope, &mut instance_aside, report);
        instance_aside.stash_into(&mut fields);
        kept.insert(id, Value::Object(fields));
    }
    map.insert("guitars".to_string(), Value::Object(kept));
    map.entry("activeGuitarId".to_string())
        .or_insert_with(|| Value::String(String::new()));
    set_aside.stash_into(&mut map);

    Ok(serde_json::from_value(Value::Object(map))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::EntryPoint;
    use serde_json::json;

    fn report() -> MigrationReport {
        MigrationReport::new(EntryPoint::Current)
    }

    #[test]
    fn version_tag_dispatch() {
        let mut r = report();
        assert_eq!(VersionedShape::parse(json!({}), &mut r).unwrap().version(), 1);
        assert_eq!(VersionedShape::parse(json!({"version": 0}), &mut r).unwrap().version(), 1);
        assert_eq!(VersionedShape::parse(json!({"version": 4}), &mut r).unwrap().version(), 4);
        assert_eq!(
            VersionedShape::parse(json!({"version": 6, "guitars": {}}), &mut r)
                .unwrap()
                .version(),
            6
        );
    }

    #[test]
    fn rejects_future_and_non_numeric_tags() {
        let mut r = report();
        assert!(matches!(
            VersionedShape::parse(json!({"version": 7}), &mut r),
            Err(MigrationError::FutureVersion { found: 7, .. })
        ));
        assert!(matches!(
            VersionedShape::parse(json!({"version": "5"}), &mut r),
            Err(MigrationError::UnrecognizedShape(_))
        ));
        assert!(matches!(
            VersionedShape::parse(json!([1, 2]), &mut r),
            Err(MigrationError::UnrecognizedShape(_))
        ));
    }

    #[test]
    fn flat_keeps_unknown_top_level_fields() {
        let mut r = report();
        let shape =
            VersionedShape::parse(json!({"version": 3, "theme": "dark"}), &mut r).unwrap();
        let VersionedShape::V3(doc) = shape else {
            panic!("v3 expected");
        };
        assert_eq!(doc.extra.get("theme"), Some(&json!("dark")));
    }

    #[test]
    fn current_recovers_bad_instance_fields() {
        let mut r = report();
        let shape = VersionedShape::parse(
            json!({
                "version": 6,
                "activeInstanceId": "a",
                "equipmentInstances": {
                    "a": {"id": "a", "playingSessions": [{"timestamp": 1, "duration": 5}, 42]},
                    "b": "not an instance"
                }
            }),
            &mut r,
        )
        .unwrap();
        let VersionedShape::V6(doc) = shape else {
            panic!("v6 expected");
        };
        assert_eq!(doc.active_instance_id, "a");
        let a = &doc.instances["a"];
        assert_eq!(a.playing_sessions.len(), 1);
        assert_eq!(a.extra["unmigrated"]["playingSessions"], json!([42]));
        assert!(!doc.instances.contains_key("b"));
        assert_eq!(doc.extra["unmigrated"]["guitars.b"], json!(["not an instance"]));
        assert_eq!(r.warnings.len(), 2);
    }

    #[test]
    fn into_flat_checks_version() {
        let shape = VersionedShape::flat(2, FlatDocument::default()).unwrap();
        assert!(shape.clone().into_flat(2, "t").is_ok());
        assert!(matches!(
            shape.into_flat(3, "t"),
            Err(MigrationError::StepMismatch { expected: 3, found: 2, .. })
        ));
    }
}
