use fretlog_migrate::{EntryPoint, IdRemap, MigrationEngine, RawStoredInput};
use fretlog_model::{Document, TaskCategory};
use fretlog_store::LegacySnapshot;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeSet;

const HISTORICAL_IDS: &[&str] = &[
    "daily-1", "daily-2", "daily-3", "weekly-1", "weekly-2", "weekly-3", "8w-1", "8w-2", "8w-3",
    "8w-4", "8w-5", "8w-6", "8w-7", "8w-8", "q-1", "q-2", "q-3", "annual-1",
];

fn task_id() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::sample::select(HISTORICAL_IDS).prop_map(str::to_string),
        "custom-[a-z]{1,6}",
        "(daily|weekly|q)-[4-9]",
    ]
}

fn reading_json() -> impl Strategy<Value = Value> {
    (1_600_000_000_000_i64..1_800_000_000_000, 0_u8..=100).prop_map(|(ms, humidity)| {
        json!({"id": ms, "timestamp": ms, "humidity": humidity, "temp": null, "location": "case"})
    })
}

fn v5_document() -> impl Strategy<Value = Value> {
    (
        proptest::collection::btree_set(task_id(), 0..12),
        any::<bool>(),
        proptest::collection::vec(reading_json(), 0..8),
        proptest::collection::vec((1_600_000_000_000_i64..1_800_000_000_000, 1_u16..240), 0..5),
    )
        .prop_map(|(ids, completed, readings, sessions)| {
            let tasks: Vec<Value> = ids
                .into_iter()
                .map(|id| json!({"id": id, "completed": completed, "lastCompleted": null}))
                .collect();
            let sessions: Vec<Value> = sessions
                .into_iter()
                .map(|(ms, minutes)| json!({"timestamp": ms, "duration": minutes}))
                .collect();
            json!({
                "version": 5,
                "maintenanceStates": {"daily": tasks},
                "humidityReadings": readings,
                "playingSessions": sessions
            })
        })
}

proptest! {
    #[test]
    fn prop_migration_is_idempotent(stored in v5_document()) {
        let engine = MigrationEngine::default();
        let first = engine.migrate_text(&stored.to_string()).document;
        let text = serde_json::to_string(&first).unwrap();
        let second = engine.migrate_text(&text);
        prop_assert_eq!(second.report.entry, EntryPoint::Current);
        prop_assert!(!second.report.needs_persist());
        prop_assert_eq!(second.document, first);
    }

    #[test]
    fn prop_remap_translates_table_ids_and_keeps_the_rest(id in task_id()) {
        let remap = IdRemap::namespaced("gs-mini");
        let mapped = remap.apply(&id);
        if HISTORICAL_IDS.contains(&id.as_str()) {
            prop_assert!(remap.translates(&id));
            prop_assert!(mapped.starts_with("gs-mini-"));
        } else {
            prop_assert!(!remap.translates(&id));
            prop_assert_eq!(mapped.as_ref(), id.as_str());
        }
    }

    #[test]
    fn prop_migration_keeps_every_task_and_record(stored in v5_document()) {
        let remap = IdRemap::namespaced("gs-mini");
        let expected_ids: BTreeSet<String> = stored["maintenanceStates"]["daily"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| remap.apply(t["id"].as_str().unwrap()).into_owned())
            .collect();

        let doc: Document = MigrationEngine::default().migrate_text(&stored.to_string()).document;
        let gs = &doc.instances["gs-mini"];
        let daily_ids: BTreeSet<String> = gs
            .maintenance_states
            .get(&TaskCategory::Daily)
            .map(|tasks| tasks.iter().map(|t| t.id.clone()).collect())
            .unwrap_or_default();
        prop_assert!(expected_ids.is_subset(&daily_ids));
        prop_assert_eq!(
            gs.humidity_readings.len(),
            stored["humidityReadings"].as_array().unwrap().len()
        );
        prop_assert_eq!(
            gs.playing_sessions.len(),
            stored["playingSessions"].as_array().unwrap().len()
        );
    }

    #[test]
    fn prop_legacy_readings_all_arrive(readings in proptest::collection::vec(reading_json(), 0..20)) {
        let legacy = LegacySnapshot {
            humidity: Some(Value::Array(readings.clone()).to_string()),
            ..LegacySnapshot::default()
        };
        let doc = MigrationEngine::default()
            .migrate(&RawStoredInput::legacy(legacy))
            .document;
        let migrated: Vec<i64> = doc.instances["gs-mini"].humidity_readings.iter().map(|r| r.id).collect();
        let original: Vec<i64> = readings.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        prop_assert_eq!(migrated, original);
    }
}
