//! Testing utilities for Fretlog workspace
//!
//! Shared fixtures: historical stored shapes, legacy key sets, and record
//! builders.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use chrono::{DateTime, TimeZone, Utc};
use fretlog_model::{
    Document, HumidityReading, PlayingSession, StringChange, TaskCategory, TaskRecord, Timestamp,
};
use fretlog_store::{KeyValueStore, MemoryStore, StorageKeys};
use serde_json::{json, Map, Value};

pub const GS_MINI: &str = "gs-mini";
pub const PRS: &str = "prs-ce24";

pub fn instant(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

pub fn ts(text: &str) -> Timestamp {
    Timestamp::Text(text.to_string())
}

pub fn reading(id: i64, timestamp: &str, humidity: f64) -> HumidityReading {
    HumidityReading {
        id,
        timestamp: ts(timestamp),
        humidity,
        temperature: None,
        location: String::new(),
        extra: Map::new(),
    }
}

pub fn session(timestamp: &str, minutes: f64) -> PlayingSession {
    PlayingSession {
        timestamp: ts(timestamp),
        duration_minutes: minutes,
        extra: Map::new(),
    }
}

pub fn string_change(date: &str, days_from_previous: Option<i64>) -> StringChange {
    StringChange {
        date: ts(date),
        brand: None,
        notes: Some(String::new()),
        days_from_previous,
        extra: Map::new(),
    }
}

pub fn task(id: &str, completed: bool, last_completed: Option<&str>) -> TaskRecord {
    TaskRecord {
        id: id.to_string(),
        completed,
        last_completed: last_completed.map(ts),
        extra: Map::new(),
    }
}

/// Default document with the given readings on the default instance
pub fn document_with_readings(readings: Vec<HumidityReading>) -> Document {
    let mut doc = Document::default();
    doc.instances.get_mut(GS_MINI).unwrap().humidity_readings = readings;
    doc
}

/// Default document with one task set on the default instance
pub fn document_with_task(category: TaskCategory, record: TaskRecord) -> Document {
    let mut doc = Document::default();
    doc.instances
        .get_mut(GS_MINI)
        .unwrap()
        .maintenance_states
        .insert(category, vec![record]);
    doc
}

/// Pre-versioning task table holding a completed six-week string change
pub fn legacy_six_week_table() -> Value {
    json!({
        "daily": [
            {"id": "daily-1", "completed": true, "lastCompleted": "2024-01-10T08:00:00.000Z"},
            {"id": "daily-2", "completed": false, "lastCompleted": null}
        ],
        "sixweek": [
            {"id": "6w-8", "completed": true, "lastCompleted": "2024-01-05T12:00:00.000Z"}
        ]
    })
}

/// Every pre-consolidation key, with realistic content
pub fn legacy_store() -> MemoryStore {
    let keys = StorageKeys::default().legacy;
    let store = MemoryStore::new();
    let entries = [
        (keys.maintenance, legacy_six_week_table().to_string()),
        (
            keys.humidity,
            json!([
                {"id": 1_704_103_200_000_i64, "timestamp": "2024-01-01T10:00:00.000Z", "humidity": 44, "temp": 20, "location": "case"},
                {"id": 1_704_189_600_000_i64, "timestamp": "2024-01-02T10:00:00.000Z", "humidity": 47, "temp": 21, "location": "room"}
            ])
            .to_string(),
        ),
        (keys.inspection, json!({"neckRelief": "ok"}).to_string()),
        (keys.onboarding_complete, "true".to_string()),
        (keys.playing_frequency, "daily".to_string()),
        (keys.playing_hours_per_week, "5".to_string()),
        (keys.has_hygrometer, "true".to_string()),
        (
            keys.playing_sessions,
            json!([{"timestamp": 1_704_200_000_000_i64, "duration": 45}]).to_string(),
        ),
        (
            keys.string_change_history,
            json!([
                {"date": 1_701_000_000_000_i64, "brand": "Elixir", "daysFromPrevious": null},
                {"date": 1_704_400_000_000_i64, "brand": null, "daysFromPrevious": 39}
            ])
            .to_string(),
        ),
    ];
    for (key, value) in entries {
        store.set(&key, &value).unwrap();
    }
    store
}

/// A stored version 5 document with single-instance history
pub fn v5_document() -> Value {
    json!({
        "version": 5,
        "maintenanceStates": {
            "daily": [
                {"id": "daily-1", "completed": true, "lastCompleted": "2024-04-01T09:00:00.000Z"},
                {"id": "daily-2", "completed": false, "lastCompleted": null},
                {"id": "daily-3", "completed": false, "lastCompleted": null}
            ],
            "eightweek": [
                {"id": "8w-8", "completed": true, "lastCompleted": "2024-03-15T12:00:00.000Z"},
                {"id": "my-custom-task", "completed": true, "lastCompleted": "2024-03-16T12:00:00.000Z"}
            ],
            "quarterly": [{"id": "q-1", "completed": false, "lastCompleted": null}]
        },
        "humidityReadings": [
            {"id": 1, "timestamp": "2024-04-01T10:00:00.000Z", "humidity": 46, "temp": 21, "location": "case"},
            {"id": 2, "timestamp": "2024-04-02T10:00:00.000Z", "humidity": 48, "temp": null, "location": "room"}
        ],
        "playingSessions": [{"timestamp": 1_711_900_000_000_i64, "duration": 30}],
        "stringChangeHistory": [
            {"date": 1_710_504_000_000_i64, "brand": "D'Addario", "notes": "", "daysFromPrevious": 56}
        ],
        "lastStringChangeDate": "2024-03-15",
        "currentStringType": "D'Addario EJ16",
        "onboardingComplete": true,
        "playingFrequency": "daily",
        "playingHoursPerWeek": 4,
        "hasHygrometer": true,
        "timerState": {"running": false, "startTimestamp": null},
        "practiceHistory": [],
        "inventory": {"items": [
            {"id": "inv-1", "category": "strings", "name": "EJ16", "count": 2, "threshold": 1, "linkedTask": "8w-8"}
        ]},
        "inspectionData": {"bridge": "flat"},
        "guitars": [{"name": "My GS Mini", "settings": {"stringChangeWeeks": 6}}],
        "theme": "dark"
    })
}

/// A stored version 2 document written before feature keys were folded in
pub fn v2_document() -> Value {
    json!({
        "version": 2,
        "maintenanceStates": {
            "daily": [{"id": "daily-1", "completed": true, "lastCompleted": "2023-12-01T00:00:00.000Z"}]
        },
        "humidityReadings": [],
        "inspectionData": {}
    })
}
