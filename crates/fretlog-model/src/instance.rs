//! Equipment instances
//!
//! An [`InstanceState`] owns the complete history of one tracked piece of
//! equipment. [`InstanceProfile`] describes a catalog entry from which a
//! blank instance is created.

use crate::error::ModelError;
use crate::records::{HumidityReading, Inventory, PlayingSession, StringChange, TimerState};
use crate::serde_util::null_as_default;
use crate::task::{TaskCategory, TaskRecord, TaskTable};
use crate::timestamp::{Timestamp, TimestampKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Inclusive humidity band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HumidityRange {
    /// Lower bound, percent
    pub min: f64,
    /// Upper bound, percent
    pub max: f64,
}

/// Humidity levels that call for immediate action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DangerThresholds {
    /// Too dry at or below
    pub low: f64,
    /// Too wet at or above
    pub high: f64,
}

/// Per-instance care settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSettings {
    /// Ideal humidity band
    pub target_humidity: HumidityRange,
    /// Acceptable humidity band
    pub safe_humidity: HumidityRange,
    /// Danger thresholds
    pub danger_humidity: DangerThresholds,
    /// Weeks between string changes
    pub string_change_weeks: u32,
    /// Expected playing hours per week
    pub playing_hours_per_week: f64,

    /// Fields this version does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InstanceSettings {
    /// Settings for a small-body acoustic
    #[must_use]
    pub fn acoustic() -> Self {
        Self {
            target_humidity: HumidityRange { min: 45.0, max: 50.0 },
            safe_humidity: HumidityRange { min: 40.0, max: 55.0 },
            danger_humidity: DangerThresholds { low: 35.0, high: 60.0 },
            string_change_weeks: 8,
            playing_hours_per_week: 2.5,
            extra: Map::new(),
        }
    }

    /// Settings for a solid-body electric
    #[must_use]
    pub fn electric() -> Self {
        Self {
            target_humidity: HumidityRange { min: 40.0, max: 60.0 },
            safe_humidity: HumidityRange { min: 30.0, max: 70.0 },
            danger_humidity: DangerThresholds { low: 20.0, high: 80.0 },
            string_change_weeks: 12,
            playing_hours_per_week: 3.5,
            extra: Map::new(),
        }
    }
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self::acoustic()
    }
}

/// Catalog entry for an equipment instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceProfile {
    /// Stable instance id
    pub id: String,
    /// Display name
    pub name: String,
    /// Care settings
    #[serde(default)]
    pub settings: InstanceSettings,
    /// Task categories tracked for this instance
    pub categories: Vec<TaskCategory>,
}

impl InstanceProfile {
    /// New profile
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        settings: InstanceSettings,
        categories: Vec<TaskCategory>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            settings,
            categories,
        }
    }

    /// Instance with empty history and every category present
    #[must_use]
    pub fn blank_instance(&self) -> InstanceState {
        InstanceState {
            id: self.id.clone(),
            name: self.name.clone(),
            settings: self.settings.clone(),
            maintenance_states: self
                .categories
                .iter()
                .map(|category| (category.clone(), Vec::new()))
                .collect(),
            ..InstanceState::default()
        }
    }
}

/// Id of the instance that inherits single-instance history
pub const DEFAULT_INSTANCE_ID: &str = "gs-mini";

/// Built-in instance catalog
#[must_use]
pub fn default_catalog() -> Vec<InstanceProfile> {
    use TaskCategory::{Annual, Daily, EightWeek, Monthly, Quarterly, Weekly};
    vec![
        InstanceProfile::new(
            DEFAULT_INSTANCE_ID,
            "Taylor GS Mini Sapele",
            InstanceSettings::acoustic(),
            vec![Daily, Weekly, EightWeek, Quarterly, Annual],
        ),
        InstanceProfile::new(
            "prs-ce24",
            "PRS SE CE24",
            InstanceSettings::electric(),
            vec![Daily, Weekly, Monthly, Quarterly, Annual],
        ),
    ]
}

fn default_frequency() -> String {
    "weekly".to_string()
}

/// Complete state of one tracked instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstanceState {
    /// Instance id; equals its key in the document
    pub id: String,
    /// Display name
    pub name: String,
    /// Care settings
    pub settings: InstanceSettings,
    /// Task state per category
    pub maintenance_states: TaskTable,
    /// Hygrometer readings, newest first
    pub humidity_readings: Vec<HumidityReading>,
    /// Practice sessions
    pub playing_sessions: Vec<PlayingSession>,
    /// String changes in the order they were recorded
    pub string_change_history: Vec<StringChange>,
    /// Date of the most recent string change
    pub last_string_change_date: Option<Timestamp>,
    /// Strings currently fitted
    pub current_string_type: Option<String>,
    /// Whether first-run setup finished
    #[serde(deserialize_with = "null_as_default")]
    pub onboarding_complete: bool,
    /// Self-reported playing frequency
    #[serde(deserialize_with = "frequency_or_default")]
    pub playing_frequency: String,
    /// Self-reported playing hours, when recorded outside settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playing_hours_per_week: Option<f64>,
    /// Whether a hygrometer is available; unknown until asked
    pub has_hygrometer: Option<bool>,
    /// Practice stopwatch
    pub timer_state: TimerState,
    /// Completed practice entries
    pub practice_history: Vec<Value>,
    /// Consumables
    pub inventory: Inventory,

    /// Fields this version does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn frequency_or_default<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_else(default_frequency))
}

impl Default for InstanceState {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            settings: InstanceSettings::default(),
            maintenance_states: TaskTable::new(),
            humidity_readings: Vec::new(),
            playing_sessions: Vec::new(),
            string_change_history: Vec::new(),
            last_string_change_date: None,
            current_string_type: None,
            onboarding_complete: false,
            playing_frequency: default_frequency(),
            playing_hours_per_week: None,
            has_hygrometer: None,
            timer_state: TimerState::default(),
            practice_history: Vec::new(),
            inventory: Inventory::default(),
            extra: Map::new(),
        }
    }
}

/// Newest first; unparseable timestamps last
fn newest_first(a: &TimestampKey, b: &TimestampKey) -> Ordering {
    match (a, b) {
        (TimestampKey::Instant(x), TimestampKey::Instant(y)) => y.cmp(x),
        (TimestampKey::Instant(_), TimestampKey::Raw(_)) => Ordering::Less,
        (TimestampKey::Raw(_), TimestampKey::Instant(_)) => Ordering::Greater,
        (TimestampKey::Raw(x), TimestampKey::Raw(y)) => x.cmp(y),
    }
}

impl InstanceState {
    /// Add a reading, keeping newest first
    ///
    /// The reading's id is bumped past the current maximum if already taken.
    /// Returns the id actually stored.
    pub fn add_humidity_reading(&mut self, mut reading: HumidityReading) -> i64 {
        if self.humidity_readings.iter().any(|r| r.id == reading.id) {
            let max = self.humidity_readings.iter().map(|r| r.id).max().unwrap_or(0);
            reading.id = max.saturating_add(1);
        }
        let id = reading.id;
        self.humidity_readings.push(reading);
        self.humidity_readings
            .sort_by(|a, b| newest_first(&a.timestamp.key(), &b.timestamp.key()));
        id
    }

    /// Remove a reading by id
    ///
    /// # Errors
    /// Returns error if no reading has that id
    pub fn remove_humidity_reading(&mut self, id: i64) -> Result<HumidityReading, ModelError> {
        let index = self
            .humidity_readings
            .iter()
            .position(|r| r.id == id)
            .ok_or(ModelError::UnknownReading(id))?;
        Ok(self.humidity_readings.remove(index))
    }

    /// Log a practice session
    pub fn log_session(&mut self, session: PlayingSession) {
        self.playing_sessions.push(session);
    }

    /// Record a string change at `at`
    ///
    /// `daysFromPrevious` is derived from the last recorded change now and
    /// never recomputed afterwards.
    pub fn record_string_change(
        &mut self,
        at: DateTime<Utc>,
        brand: Option<String>,
        notes: impl Into<String>,
    ) -> &StringChange {
        let days_from_previous = self
            .string_change_history
            .last()
            .and_then(|prev| prev.date.instant())
            .map(|prev| (at - prev).num_days());
        let date = Timestamp::from_instant(at);
        if brand.is_some() {
            self.current_string_type.clone_from(&brand);
        }
        self.last_string_change_date = Some(date.clone());
        self.string_change_history.push(StringChange {
            date,
            brand,
            notes: Some(notes.into()),
            days_from_previous,
            extra: Map::new(),
        });
        let last = self.string_change_history.len() - 1;
        &self.string_change_history[last]
    }

    /// Mark a task complete at `at`
    ///
    /// Tasks without saved state are added to their category.
    pub fn complete_task(&mut self, category: &TaskCategory, id: &str, at: Timestamp) {
        let tasks = self.maintenance_states.entry(category.clone()).or_default();
        match tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.completed = true;
                task.last_completed = Some(at);
            }
            None => tasks.push(TaskRecord::new(id).completed_at(at)),
        }
    }

    /// Uncheck every task in a category, keeping completion history
    ///
    /// Returns the number of tasks unchecked.
    pub fn reset_category(&mut self, category: &TaskCategory) -> usize {
        let Some(tasks) = self.maintenance_states.get_mut(category) else {
            return 0;
        };
        let mut unchecked = 0;
        for task in tasks.iter_mut().filter(|t| t.completed) {
            task.completed = false;
            unchecked += 1;
        }
        unchecked
    }

    /// Saved state of one task
    ///
    /// # Errors
    /// Returns error if the task has no saved state
    pub fn task(&self, category: &TaskCategory, id: &str) -> Result<&TaskRecord, ModelError> {
        self.maintenance_states
            .get(category)
            .and_then(|tasks| tasks.iter().find(|t| t.id == id))
            .ok_or_else(|| ModelError::UnknownTask {
                category: category.clone(),
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn blank_instance_has_every_category() {
        let catalog = default_catalog();
        let gs = catalog[0].blank_instance();
        assert_eq!(gs.id, DEFAULT_INSTANCE_ID);
        assert!(gs.maintenance_states.contains_key(&TaskCategory::EightWeek));
        assert!(gs.maintenance_states.values().all(Vec::is_empty));
        let prs = catalog[1].blank_instance();
        assert!(prs.maintenance_states.contains_key(&TaskCategory::Monthly));
        assert!(!prs.maintenance_states.contains_key(&TaskCategory::EightWeek));
        assert_eq!(prs.settings.string_change_weeks, 12);
    }

    #[test]
    fn readings_stay_newest_first_with_unique_ids() {
        let mut gs = InstanceState::default();
        let first = HumidityReading::new(45.0, None, "case", day(1)).unwrap();
        let mut clash = HumidityReading::new(47.0, None, "room", day(3)).unwrap();
        clash.id = first.id;
        let first_id = gs.add_humidity_reading(first);
        let clash_id = gs.add_humidity_reading(clash);
        assert_ne!(first_id, clash_id);
        assert_eq!(gs.humidity_readings[0].location, "room");
        gs.remove_humidity_reading(first_id).unwrap();
        assert_eq!(gs.humidity_readings.len(), 1);
        assert_eq!(
            gs.remove_humidity_reading(first_id),
            Err(ModelError::UnknownReading(first_id))
        );
    }

    #[test]
    fn string_change_days_are_cached_at_write() {
        let mut gs = InstanceState::default();
        assert_eq!(gs.record_string_change(day(1), None, "").days_from_previous, None);
        let change = gs.record_string_change(day(15), Some("Elixir".into()), "bright");
        assert_eq!(change.days_from_previous, Some(14));
        assert_eq!(gs.current_string_type.as_deref(), Some("Elixir"));
        assert!(gs.last_string_change_date.is_some());
    }

    #[test]
    fn complete_and_reset_tasks() {
        let mut gs = InstanceState::default();
        let at = Timestamp::from_instant(day(2));
        gs.complete_task(&TaskCategory::Daily, "gs-mini-daily-1", at.clone());
        gs.complete_task(&TaskCategory::Daily, "gs-mini-daily-2", at.clone());
        let task = gs.task(&TaskCategory::Daily, "gs-mini-daily-1").unwrap();
        assert!(task.completed);
        assert_eq!(task.last_completed, Some(at.clone()));

        assert_eq!(gs.reset_category(&TaskCategory::Daily), 2);
        let task = gs.task(&TaskCategory::Daily, "gs-mini-daily-1").unwrap();
        assert!(!task.completed);
        assert_eq!(task.last_completed, Some(at));
        assert_eq!(gs.reset_category(&TaskCategory::Annual), 0);
    }

    #[test]
    fn missing_fields_take_defaults_and_unknowns_survive() {
        let gs: InstanceState =
            serde_json::from_str(r#"{"id":"x","playingFrequency":null,"strap":"leather"}"#).unwrap();
        assert_eq!(gs.playing_frequency, "weekly");
        assert!(gs.humidity_readings.is_empty());
        assert_eq!(gs.extra.get("strap"), Some(&Value::from("leather")));
    }
}
