//! Strategies for each persisted collection

use crate::strategy::{MergeStrategy, Resolution};
use fretlog_model::{
    HumidityReading, InventoryItem, PlayingSession, StringChange, TaskRecord, TimestampKey,
};

/// Humidity readings, one per timestamp, live copy kept
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadingsByTimestamp;

impl MergeStrategy for ReadingsByTimestamp {
    type Record = HumidityReading;
    type Key = TimestampKey;
    const SORT_AFTER_MERGE: bool = true;

    fn name(&self) -> &'static str {
        "humidityReadings"
    }

    fn key(&self, record: &HumidityReading) -> TimestampKey {
        record.timestamp.key()
    }
}

/// Playing sessions, one per timestamp, live copy kept
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionsByTimestamp;

impl MergeStrategy for SessionsByTimestamp {
    type Record = PlayingSession;
    type Key = TimestampKey;
    const SORT_AFTER_MERGE: bool = true;

    fn name(&self) -> &'static str {
        "playingSessions"
    }

    fn key(&self, record: &PlayingSession) -> TimestampKey {
        record.timestamp.key()
    }
}

/// String changes, one per date, live copy kept
///
/// Order is left as found: `daysFromPrevious` was computed against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringChangesByDate;

impl MergeStrategy for StringChangesByDate {
    type Record = StringChange;
    type Key = TimestampKey;

    fn name(&self) -> &'static str {
        "stringChangeHistory"
    }

    fn key(&self, record: &StringChange) -> TimestampKey {
        record.date.key()
    }
}

/// Tasks within one category, most recent completion wins
#[derive(Debug, Clone, Copy, Default)]
pub struct TasksByRecency;

impl MergeStrategy for TasksByRecency {
    type Record = TaskRecord;
    type Key = String;

    fn name(&self) -> &'static str {
        "maintenanceStates"
    }

    fn key(&self, record: &TaskRecord) -> String {
        record.id.clone()
    }

    fn resolve(&self, live: &TaskRecord, foreign: &TaskRecord) -> Resolution {
        if foreign.completed_after(live) {
            Resolution::TakeForeign
        } else {
            Resolution::KeepLive
        }
    }
}

/// Inventory items by id, live copy kept
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemsById;

impl MergeStrategy for ItemsById {
    type Record = InventoryItem;
    type Key = String;

    fn name(&self) -> &'static str {
        "inventory.items"
    }

    fn key(&self, record: &InventoryItem) -> String {
        record.id.clone()
    }
}
