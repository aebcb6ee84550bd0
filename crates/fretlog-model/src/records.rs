//! Per-instance history records
//!
//! Every record keeps the fields this version does not interpret in an
//! `extra` map, so data written by a newer build survives a round trip.

use crate::error::ModelError;
use crate::serde_util::null_as_default;
use crate::timestamp::Timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One hygrometer reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumidityReading {
    /// Creation-time-derived id, unique within an instance
    #[serde(default)]
    pub id: i64,

    /// When the reading was taken
    pub timestamp: Timestamp,

    /// Relative humidity in percent
    pub humidity: f64,

    /// Temperature, when recorded
    #[serde(rename = "temp", alias = "temperature", default)]
    pub temperature: Option<f64>,

    /// Free-form location label
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,

    /// Fields this version does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HumidityReading {
    /// Validated reading taken at `at`, id derived from the instant
    ///
    /// # Errors
    /// Returns error if humidity is outside 0..=100 or a value is not finite
    pub fn new(
        humidity: f64,
        temperature: Option<f64>,
        location: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<Self, ModelError> {
        if !humidity.is_finite() {
            return Err(ModelError::NotFinite { field: "humidity" });
        }
        if !(0.0..=100.0).contains(&humidity) {
            return Err(ModelError::HumidityOutOfRange(humidity));
        }
        if temperature.is_some_and(|t| !t.is_finite()) {
            return Err(ModelError::NotFinite { field: "temp" });
        }
        Ok(Self {
            id: at.timestamp_millis(),
            timestamp: Timestamp::from_instant(at),
            humidity,
            temperature,
            location: location.into(),
            extra: Map::new(),
        })
    }
}

/// One practice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayingSession {
    /// When the session was logged
    pub timestamp: Timestamp,

    /// Length in minutes
    #[serde(rename = "duration", alias = "durationMinutes", default)]
    pub duration_minutes: f64,

    /// Fields this version does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlayingSession {
    /// Session of `minutes` logged at `at`
    #[must_use]
    pub fn new(minutes: f64, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: Timestamp::from_instant(at),
            duration_minutes: minutes,
            extra: Map::new(),
        }
    }
}

/// One string change
///
/// `days_from_previous` is computed once, when the change is recorded, and
/// carried verbatim from then on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringChange {
    /// When the strings were changed
    pub date: Timestamp,

    /// String brand, when known
    #[serde(default)]
    pub brand: Option<String>,

    /// Notes; absent on records written before notes existed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Whole days since the previous change
    #[serde(default)]
    pub days_from_previous: Option<i64>,

    /// Fields this version does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One consumable in the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    /// Item id (`inv-<millis>` for items created here)
    pub id: String,

    /// Category label
    #[serde(default = "default_item_category")]
    pub category: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Units on hand
    #[serde(default)]
    pub count: u32,

    /// Restock when `count` is at or below this
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// Task id that consumes this item
    #[serde(default, alias = "linkedTaskId")]
    pub linked_task: Option<String>,

    /// Fields this version does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_item_category() -> String {
    "other".to_string()
}

const fn default_threshold() -> u32 {
    1
}

impl InventoryItem {
    /// New item created at `at`
    #[must_use]
    pub fn new(name: impl Into<String>, category: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: format!("inv-{}", at.timestamp_millis()),
            category: category.into(),
            name: name.into(),
            count: 0,
            threshold: default_threshold(),
            linked_task: None,
            extra: Map::new(),
        }
    }

    /// Set the starting count
    #[inline]
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Set the restock threshold
    #[inline]
    #[must_use]
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Link to the task that consumes this item
    #[inline]
    #[must_use]
    pub fn with_linked_task(mut self, task_id: impl Into<String>) -> Self {
        self.linked_task = Some(task_id.into());
        self
    }

    /// Whether the item needs restocking
    #[inline]
    #[must_use]
    pub const fn needs_restock(&self) -> bool {
        self.count <= self.threshold
    }
}

/// Consumables on hand
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Items in insertion order
    #[serde(default)]
    pub items: Vec<InventoryItem>,

    /// Fields this version does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Inventory {
    /// Add an item
    ///
    /// # Errors
    /// Returns error if an item with the same id exists
    pub fn add(&mut self, item: InventoryItem) -> Result<(), ModelError> {
        if self.get(&item.id).is_some() {
            return Err(ModelError::DuplicateItem(item.id));
        }
        self.items.push(item);
        Ok(())
    }

    /// Item by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&InventoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut InventoryItem, ModelError> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| ModelError::UnknownItem(id.to_string()))
    }

    /// Add one unit, returning the new count
    ///
    /// # Errors
    /// Returns error if no such item exists
    pub fn increment(&mut self, id: &str) -> Result<u32, ModelError> {
        let item = self.get_mut(id)?;
        item.count = item.count.saturating_add(1);
        Ok(item.count)
    }

    /// Remove one unit, returning the new count
    ///
    /// # Errors
    /// Returns error if no such item exists or the count is already zero
    pub fn decrement(&mut self, id: &str) -> Result<u32, ModelError> {
        let item = self.get_mut(id)?;
        if item.count == 0 {
            return Err(ModelError::InventoryExhausted(id.to_string()));
        }
        item.count -= 1;
        Ok(item.count)
    }

    /// Remove an item, returning it
    ///
    /// # Errors
    /// Returns error if no such item exists
    pub fn remove(&mut self, id: &str) -> Result<InventoryItem, ModelError> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| ModelError::UnknownItem(id.to_string()))?;
        Ok(self.items.remove(index))
    }

    /// Items at or below their restock threshold
    pub fn restock_needed(&self) -> impl Iterator<Item = &InventoryItem> {
        self.items.iter().filter(|item| item.needs_restock())
    }

    /// First item consumed by the given task
    #[must_use]
    pub fn linked_to(&self, task_id: &str) -> Option<&InventoryItem> {
        self.items
            .iter()
            .find(|item| item.linked_task.as_deref() == Some(task_id))
    }
}

/// Practice stopwatch
///
/// Only the start instant is stored; elapsed time is computed on read, so a
/// running timer survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Whether the timer is running
    #[serde(default, deserialize_with = "null_as_default")]
    pub running: bool,

    /// Start instant while running
    #[serde(default)]
    pub start_timestamp: Option<Timestamp>,
}

impl TimerState {
    /// Start at `now`
    ///
    /// # Errors
    /// Returns error if already running
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), ModelError> {
        if self.running {
            return Err(ModelError::TimerRunning);
        }
        self.running = true;
        self.start_timestamp = Some(Timestamp::Millis(now.timestamp_millis()));
        Ok(())
    }

    /// Elapsed time at `now`, `None` while stopped
    ///
    /// A start instant in the future reads as zero.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        if !self.running {
            return None;
        }
        let start = self.start_timestamp.as_ref()?.instant()?;
        Some((now - start).max(chrono::Duration::zero()))
    }

    /// Stop at `now`, returning elapsed minutes
    ///
    /// # Errors
    /// Returns error if not running
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<f64, ModelError> {
        if !self.running {
            return Err(ModelError::TimerIdle);
        }
        let elapsed = self.elapsed(now).unwrap_or_else(chrono::Duration::zero);
        self.running = false;
        self.start_timestamp = None;
        #[allow(clippy::cast_precision_loss)]
        Ok(elapsed.num_milliseconds() as f64 / 60_000.0)
    }
}
