//! The step table
//!
//! One transform per adjacent pair of versions, looked up by the source
//! version's discriminant. Each step accepts exactly one shape and returns
//! exactly the next; the engine checks both sides.

use crate::error::{MigrationError, MigrationWarning};
use crate::legacy;
use crate::lenient::SetAside;
use crate::options::MigrationOptions;
use crate::remap::{fold_task, normalize_six_week, IdRemap};
use crate::report::MigrationReport;
use crate::shape::VersionedShape;
use fretlog_model::{Document, InstanceSettings, InstanceState, TaskTable};
use fretlog_store::LegacySnapshot;
use serde_json::Value;

/// What a step may consult besides the document
pub(crate) struct StepContext<'a> {
    pub(crate) options: &'a MigrationOptions,
    pub(crate) legacy: &'a LegacySnapshot,
}

type StepFn =
    fn(VersionedShape, &StepContext<'_>, &mut MigrationReport) -> Result<VersionedShape, MigrationError>;

/// One version-to-version transform
pub struct MigrationStep {
    /// Source version
    pub from: u32,
    /// Destination version
    pub to: u32,
    /// What the step does
    pub description: &'static str,
    apply: StepFn,
}

impl std::fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationStep")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl MigrationStep {
    pub(crate) fn apply(
        &self,
        shape: VersionedShape,
        ctx: &StepContext<'_>,
        report: &mut MigrationReport,
    ) -> Result<VersionedShape, MigrationError> {
        (self.apply)(shape, ctx, report)
    }
}

static STEPS: [MigrationStep; 5] = [
    MigrationStep {
        from: 1,
        to: 2,
        description: "re-tag unversioned document",
        apply: v1_to_v2,
    },
    MigrationStep {
        from: 2,
        to: 3,
        description: "fold feature keys into the document",
        apply: v2_to_v3,
    },
    MigrationStep {
        from: 3,
        to: 4,
        description: "add stopwatch, practice history and inventory",
        apply: v3_to_v4,
    },
    MigrationStep {
        from: 4,
        to: 5,
        description: "fold legacy readings and task table into the document",
        apply: v4_to_v5,
    },
    MigrationStep {
        from: 5,
        to: 6,
        description: "move history under named instances and remap task ids",
        apply: v5_to_v6,
    },
];

/// Every step, in order
#[must_use]
pub fn steps() -> &'static [MigrationStep] {
    &STEPS
}

/// Step starting at `version`
#[must_use]
pub fn step_from(version: u32) -> Option<&'static MigrationStep> {
    STEPS.iter().find(|step| step.from == version)
}

/// Six-week tasks become eight-week tasks, as legacy key tables do
fn v1_to_v2(
    shape: VersionedShape,
    _ctx: &StepContext<'_>,
    _report: &mut MigrationReport,
) -> Result<VersionedShape, MigrationError> {
    let mut doc = shape.into_flat(1, STEPS[0].description)?;
    if let Some(table) = doc.maintenance_states.take() {
        doc.maintenance_states = Some(normalize_six_week(table));
    }
    VersionedShape::flat(2, doc)
}

/// Present document values always win over legacy keys
fn v2_to_v3(
    shape: VersionedShape,
    ctx: &StepContext<'_>,
    report: &mut MigrationReport,
) -> Result<VersionedShape, MigrationError> {
    let mut doc = shape.into_flat(2, STEPS[1].description)?;
    let keys = &ctx.options.legacy_keys;
    let legacy = ctx.legacy;
    let mut set_aside = SetAside::default();

    if doc.onboarding_complete.is_none() {
        doc.onboarding_complete = Some(legacy::flag(legacy.onboarding_complete.as_deref()) == Some(true));
    }
    if doc.playing_frequency.is_none() {
        doc.playing_frequency = Some(
            legacy
                .playing_frequency
                .clone()
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| "weekly".to_string()),
        );
    }
    if doc.playing_hours_per_week.is_none() {
        doc.playing_hours_per_week = Some(legacy::hours(legacy, keys, &mut set_aside, report).unwrap_or(2.5));
    }
    if doc.has_hygrometer.is_none() {
        doc.has_hygrometer = legacy::flag(legacy.has_hygrometer.as_deref());
    }
    if doc.playing_sessions.is_none() {
        doc.playing_sessions = Some(legacy::sessions(legacy, keys, &mut set_aside, report).unwrap_or_default());
    }
    if doc.string_change_history.is_none() {
        doc.string_change_history =
            Some(legacy::string_changes(legacy, keys, &mut set_aside, report).unwrap_or_default());
    }
    if doc.current_string_type.is_none() {
        doc.current_string_type = Some(ctx.options.default_string_type.clone());
    }
    set_aside.stash_into(&mut doc.extra);
    VersionedShape::flat(3, doc)
}

/// `daysFromPrevious` is left exactly as found
fn v3_to_v4(
    shape: VersionedShape,
    _ctx: &StepContext<'_>,
    _report: &mut MigrationReport,
) -> Result<VersionedShape, MigrationError> {
    let mut doc = shape.into_flat(3, STEPS[2].description)?;
    doc.timer_state.get_or_insert_with(Default::default);
    doc.practice_history.get_or_insert_with(Vec::new);
    doc.inventory.get_or_insert_with(Default::default);
    for change in doc.string_change_history.iter_mut().flatten() {
        change.notes.get_or_insert_with(String::new);
    }
    VersionedShape::flat(4, doc)
}

fn v4_to_v5(
    shape: VersionedShape,
    ctx: &StepContext<'_>,
    report: &mut MigrationReport,
) -> Result<VersionedShape, MigrationError> {
    let mut doc = shape.into_flat(4, STEPS[3].description)?;
    let keys = &ctx.options.legacy_keys;
    let mut set_aside = SetAside::default();

    if doc.humidity_readings.as_ref().map_or(true, Vec::is_empty) {
        doc.humidity_readings = Some(
            legacy::readings(ctx.legacy, keys, false, &mut set_aside, report).unwrap_or_default(),
        );
    }
    if let Some(legacy_tasks) = legacy::task_table(ctx.legacy, keys, &mut set_aside, report) {
        merge_task_tables(doc.maintenance_states.get_or_insert_with(TaskTable::new), legacy_tasks);
    }
    set_aside.stash_into(&mut doc.extra);
    VersionedShape::flat(5, doc)
}

/// Fold `incoming` into `table`
///
/// A missing category or task is taken whole; a task on both sides keeps
/// whichever copy was completed more recently.
fn merge_task_tables(table: &mut TaskTable, incoming: TaskTable) {
    for (category, incoming_tasks) in incoming {
        let Some(existing) = table.get_mut(&category) else {
            table.insert(category, incoming_tasks);
            continue;
        };
        for task in incoming_tasks {
            fold_task(existing, task);
        }
    }
}

/// Document fields a flat document's unknown fields must not shadow
const RESERVED: &[&str] = &[
    "version",
    "activeGuitarId",
    "activeInstanceId",
    "guitars",
    "equipmentInstances",
    "syncQueue",
    "pendingSyncQueue",
    "inspectionData",
    "legacyGuitars",
];

fn v5_to_v6(
    shape: VersionedShape,
    ctx: &StepContext<'_>,
    report: &mut MigrationReport,
) -> Result<VersionedShape, MigrationError> {
    let flat = shape.into_flat(5, STEPS[4].description)?;
    let options = ctx.options;
    let default_id = options.default_instance.as_str();

    let mut doc = Document::fresh(&options.catalog, default_id);
    let mut instance = doc.instances.remove(default_id).unwrap_or_else(|| InstanceState {
        id: default_id.to_string(),
        name: default_id.to_string(),
        ..InstanceState::default()
    });

    if let Some(old) = flat
        .guitars
        .as_ref()
        .and_then(|guitars| guitars.first())
        .and_then(|first| first.get("settings"))
    {
        match overlay_settings(&instance.settings, old) {
            Ok(settings) => instance.settings = settings,
            Err(reason) => report.warn(MigrationWarning::UnrecognizedField {
                field: "guitars.0.settings".to_string(),
                reason,
            }),
        }
    }

    let remap = IdRemap::namespaced(default_id);
    if let Some(mut table) = flat.maintenance_states {
        let remapped = remap.apply_to_table(&mut table);
        tracing::debug!(remapped, instance = default_id, "task ids remapped");
        instance.maintenance_states.extend(table);
    }
    instance.humidity_readings = flat.humidity_readings.unwrap_or_default();
    instance.playing_sessions = flat.playing_sessions.unwrap_or_default();
    instance.string_change_history = flat.string_change_history.unwrap_or_default();
    instance.last_string_change_date = flat.last_string_change_date;
    instance.current_string_type = flat.current_string_type;
    instance.onboarding_complete = flat.onboarding_complete.unwrap_or(false);
    instance.playing_frequency = flat
        .playing_frequency
        .unwrap_or_else(|| "weekly".to_string());
    instance.playing_hours_per_week = Some(flat.playing_hours_per_week.unwrap_or(2.5));
    instance.has_hygrometer = flat.has_hygrometer;
    instance.timer_state = flat.timer_state.unwrap_or_default();
    instance.practice_history = flat.practice_history.unwrap_or_default();
    instance.inventory = flat.inventory.unwrap_or_default();
    for item in &mut instance.inventory.items {
        if let Some(task) = item.linked_task.as_mut() {
            *task = remap.apply(task).into_owned();
        }
    }

    doc.inspection_data = flat.inspection_data.unwrap_or_default();
    doc.sync_queue = Vec::new();
    if let Some(guitars) = flat.guitars.filter(|g| !g.is_empty()) {
        doc.extra
            .insert("legacyGuitars".to_string(), Value::Array(guitars));
    }
    let mut set_aside = SetAside::default();
    for (key, value) in flat.extra {
        if RESERVED.contains(&key.as_str()) {
            set_aside.push(&key, value);
        } else {
            doc.extra.insert(key, value);
        }
    }
    set_aside.stash_into(&mut doc.extra);

    doc.instances.insert(default_id.to_string(), instance);
    doc.active_instance_id = default_id.to_string();
    Ok(VersionedShape::V6(doc))
}

/// Old settings keys replace the defaults one by one
fn overlay_settings(defaults: &InstanceSettings, old: &Value) -> Result<InstanceSettings, String> {
    let Value::Object(old) = old else {
        return Err("expected an object".to_string());
    };
    let Value::Object(mut merged) = serde_json::to_value(defaults).map_err(|e| e.to_string())? else {
        return Err("settings did not serialize to an object".to_string());
    };
    for (key, value) in old {
        merged.insert(key.clone(), value.clone());
    }
    serde_json::from_value(Value::Object(merged)).map_err(|e| e.to_string())
}
