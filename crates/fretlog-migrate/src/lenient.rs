//! Field-by-field recovery of malformed input
//!
//! Before a map is handed to serde, every known field is checked against its
//! target type. A field that does not fit is removed; a collection element
//! that does not fit is removed from its collection. Everything removed is
//! reported and kept under an `unmigrated` key so no input is lost.

use crate::error::MigrationWarning;
use crate::report::MigrationReport;
use fretlog_model::{
    HumidityReading, InstanceSettings, InventoryItem, PlayingSession, StringChange, TaskRecord,
    TimerState, Timestamp,
};
use fretlog_model::UNMIGRATED_KEY;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub(crate) type Check = fn(&Value) -> Result<(), String>;

fn check<T: DeserializeOwned>(value: &Value) -> Result<(), String> {
    T::deserialize(value).map(|_| ()).map_err(|e| e.to_string())
}

pub(crate) enum FieldKind {
    /// One value of a fixed type
    Single(Check),
    /// Array of records, checked one by one
    Records(Check),
    /// Object of category → array of records
    Table(Check),
    /// Object whose own fields are sifted by these rules
    Nested(&'static [FieldRule]),
}

pub(crate) struct FieldRule {
    pub(crate) name: &'static str,
    pub(crate) kind: FieldKind,
}

const fn single(name: &'static str, check: Check) -> FieldRule {
    FieldRule {
        name,
        kind: FieldKind::Single(check),
    }
}

const fn records(name: &'static str, check: Check) -> FieldRule {
    FieldRule {
        name,
        kind: FieldKind::Records(check),
    }
}

/// Per-instance fields, shared by flat (v1-v5) documents and v6 instances
pub(crate) const HISTORY_FIELDS: &[FieldRule] = &[
    FieldRule {
        name: "maintenanceStates",
        kind: FieldKind::Table(check::<TaskRecord>),
    },
    records("humidityReadings", check::<HumidityReading>),
    records("playingSessions", check::<PlayingSession>),
    records("stringChangeHistory", check::<StringChange>),
    records("practiceHistory", check::<Value>),
    single("lastStringChangeDate", check::<Timestamp>),
    single("currentStringType", check::<String>),
    single("onboardingComplete", check::<bool>),
    single("playingFrequency", check::<String>),
    single("playingHoursPerWeek", check::<f64>),
    single("hasHygrometer", check::<bool>),
    single("timerState", check::<TimerState>),
    FieldRule {
        name: "inventory",
        kind: FieldKind::Nested(INVENTORY_FIELDS),
    },
];

/// Inventory fields; items are checked one by one
pub(crate) const INVENTORY_FIELDS: &[FieldRule] = &[records("items", check::<InventoryItem>)];

/// Fields only a v6 instance carries
pub(crate) const INSTANCE_FIELDS: &[FieldRule] = &[
    single("id", check::<String>),
    single("name", check::<String>),
    single("settings", check::<InstanceSettings>),
];

/// Top-level fields of a flat document besides the history fields
pub(crate) const FLAT_FIELDS: &[FieldRule] = &[
    single("inspectionData", check::<Map<String, Value>>),
    records("guitars", check::<Value>),
];

/// Top-level fields of a v6 document besides `guitars`
pub(crate) const DOCUMENT_FIELDS: &[FieldRule] = &[
    single("activeGuitarId", check::<String>),
    records("syncQueue", check::<Value>),
    single("inspectionData", check::<Map<String, Value>>),
];

/// Input removed from a map, by field name
#[derive(Debug, Default)]
pub(crate) struct SetAside(Map<String, Value>);

impl SetAside {
    pub(crate) fn push(&mut self, field: &str, value: Value) {
        let slot = self
            .0
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = slot {
            items.push(value);
        }
    }

    /// Take everything `other` set aside, naming it under `prefix`
    fn absorb(&mut self, prefix: &str, other: Self) {
        for (field, rejected) in other.0 {
            let name = path(prefix, &field);
            match rejected {
                Value::Array(items) => {
                    for item in items {
                        self.push(&name, item);
                    }
                }
                other => self.push(&name, other),
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append everything into `target[UNMIGRATED_KEY]`
    pub(crate) fn stash_into(self, target: &mut Map<String, Value>) {
        if self.is_empty() {
            return;
        }
        let slot = target
            .entry(UNMIGRATED_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            let previous = std::mem::replace(slot, Value::Object(Map::new()));
            if let Value::Object(map) = slot {
                map.insert("previous".to_string(), previous);
            }
        }
        let Value::Object(stash) = slot else {
            return;
        };
        for (field, rejected) in self.0 {
            let Value::Array(rejected) = rejected else {
                continue;
            };
            match stash.get_mut(&field) {
                Some(Value::Array(existing)) => existing.extend(rejected),
                _ => {
                    stash.insert(field, Value::Array(rejected));
                }
            }
        }
    }
}

fn path(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

/// Remove everything in `map` that does not fit `fields`
///
/// Explicit `null`s are removed silently; they read as absent.
pub(crate) fn sift(
    map: &mut Map<String, Value>,
    fields: &[FieldRule],
    scope: &str,
    set_aside: &mut SetAside,
    report: &mut MigrationReport,
) {
    for rule in fields {
        let Some(value) = map.remove(rule.name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let field = path(scope, rule.name);
        let kept = match rule.kind {
            FieldKind::Single(check) => sift_single(value, check, &field, rule.name, set_aside, report),
            FieldKind::Records(check) => sift_records(value, check, &field, rule.name, set_aside, report),
            FieldKind::Table(check) => sift_table(value, check, &field, rule.name, set_aside, report),
            FieldKind::Nested(rules) => sift_nested(value, rules, &field, rule.name, set_aside, report),
        };
        if let Some(kept) = kept {
            map.insert(rule.name.to_string(), kept);
        }
    }
}

fn sift_single(
    value: Value,
    check: Check,
    field: &str,
    name: &str,
    set_aside: &mut SetAside,
    report: &mut MigrationReport,
) -> Option<Value> {
    match check(&value) {
        Ok(()) => Some(value),
        Err(reason) => {
            report.warn(MigrationWarning::UnrecognizedField {
                field: field.to_string(),
                reason,
            });
            set_aside.push(name, value);
            None
        }
    }
}

fn sift_records(
    value: Value,
    check: Check,
    field: &str,
    name: &str,
    set_aside: &mut SetAside,
    report: &mut MigrationReport,
) -> Option<Value> {
    let Value::Array(items) = value else {
        report.warn(MigrationWarning::UnrecognizedField {
            field: field.to_string(),
            reason: "expected an array".to_string(),
        });
        set_aside.push(name, value);
        return None;
    };
    let mut kept = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match check(&item) {
            Ok(()) => kept.push(item),
            Err(reason) => {
                report.warn(MigrationWarning::UnrecognizedRecord {
                    field: field.to_string(),
                    index,
                    reason,
                });
                set_aside.push(name, item);
            }
        }
    }
    Some(Value::Array(kept))
}

fn sift_table(
    value: Value,
    check: Check,
    field: &str,
    name: &str,
    set_aside: &mut SetAside,
    report: &mut MigrationReport,
) -> Option<Value> {
    let Value::Object(categories) = value else {
        report.warn(MigrationWarning::UnrecognizedField {
            field: field.to_string(),
            reason: "expected an object of task lists".to_string(),
        });
        set_aside.push(name, value);
        return None;
    };
    let mut kept = Map::new();
    for (category, tasks) in categories {
        let category_field = format!("{field}.{category}");
        let category_name = format!("{name}.{category}");
        let tasks = match tasks {
            Value::Null => Value::Array(Vec::new()),
            other => other,
        };
        if let Some(tasks) =
            sift_records(tasks, check, &category_field, &category_name, set_aside, report)
        {
            kept.insert(category, tasks);
        }
    }
    Some(Value::Object(kept))
}

fn sift_nested(
    value: Value,
    rules: &[FieldRule],
    field: &str,
    name: &str,
    set_aside: &mut SetAside,
    report: &mut MigrationReport,
) -> Option<Value> {
    let Value::Object(mut inner) = value else {
        report.warn(MigrationWarning::UnrecognizedField {
            field: field.to_string(),
            reason: "expected an object".to_string(),
        });
        set_aside.push(name, value);
        return None;
    };
    let mut inner_aside = SetAside::default();
    sift(&mut inner, rules, field, &mut inner_aside, report);
    set_aside.absorb(name, inner_aside);
    Some(Value::Object(inner))
}

/// Rename `alias` to `canonical` when only the alias is present
pub(crate) fn canonicalize_key(map: &mut Map<String, Value>, alias: &str, canonical: &str) {
    if map.contains_key(canonical) {
        return;
    }
    if let Some(value) = map.remove(alias) {
        map.insert(canonical.to_string(), value);
    }
}
