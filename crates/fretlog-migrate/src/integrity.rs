//! Integrity check at the current version
//!
//! Runs on every document the engine returns. Each fix is recorded in the
//! report; a document that needs none comes back equal to its input.

use crate::options::MigrationOptions;
use crate::report::MigrationReport;
use fretlog_model::{Document, CURRENT_VERSION};
use serde_json::{Map, Value};

/// Collections every stored instance must carry
const INSTANCE_COLLECTIONS: &[&str] = &[
    "maintenanceStates",
    "humidityReadings",
    "playingSessions",
    "stringChangeHistory",
    "inventory",
    "timerState",
    "practiceHistory",
];

/// Collections every stored document must carry
const DOCUMENT_COLLECTIONS: &[(&str, &str)] = &[
    ("syncQueue", "pendingSyncQueue"),
    ("inspectionData", "inspectionData"),
];

/// Report collections absent from a stored current-version document
///
/// Deserialization fills them with their empty defaults; this only makes
/// that visible.
pub(crate) fn note_missing_collections(map: &Map<String, Value>, report: &mut MigrationReport) {
    for (name, alias) in DOCUMENT_COLLECTIONS {
        if !map.contains_key(*name) && !map.contains_key(*alias) {
            report.repair(*name, "was missing; set to empty");
        }
    }
    let instances = map
        .get("guitars")
        .or_else(|| map.get("equipmentInstances"))
        .and_then(Value::as_object);
    for (id, instance) in instances.into_iter().flatten() {
        let Some(fields) = instance.as_object() else {
            continue;
        };
        for name in INSTANCE_COLLECTIONS {
            if fields.get(*name).map_or(true, Value::is_null) {
                report.repair(format!("guitars.{id}.{name}"), "was missing; set to empty");
            }
        }
    }
}

/// Fix structural problems in a current-version document
pub(crate) fn verify(doc: &mut Document, options: &MigrationOptions, report: &mut MigrationReport) {
    if doc.version != CURRENT_VERSION {
        report.repair("version", format!("was {}; set to {CURRENT_VERSION}", doc.version));
        doc.version = CURRENT_VERSION;
    }

    for (key, instance) in &mut doc.instances {
        if instance.id != *key {
            report.repair(
                format!("guitars.{key}.id"),
                format!("was `{}`; set to its key", instance.id),
            );
            instance.id.clone_from(key);
        }
    }

    for profile in &options.catalog {
        if !doc.instances.contains_key(&profile.id) {
            report.repair(format!("guitars.{}", profile.id), "was missing; added blank");
            doc.instances
                .insert(profile.id.clone(), profile.blank_instance());
        }
    }

    if !doc.instances.contains_key(&doc.active_instance_id) {
        let replacement = if doc.instances.contains_key(&options.default_instance) {
            Some(options.default_instance.clone())
        } else {
            doc.instances.keys().next().cloned()
        };
        if let Some(replacement) = replacement {
            report.repair(
                "activeGuitarId",
                format!(
                    "`{}` named no instance; set to `{replacement}`",
                    doc.active_instance_id
                ),
            );
            doc.active_instance_id = replacement;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::EntryPoint;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn whole_document_needs_no_repair() {
        let mut doc = Document::default();
        let before = doc.clone();
        let mut report = MigrationReport::new(EntryPoint::Current);
        verify(&mut doc, &MigrationOptions::default(), &mut report);
        let raw = serde_json::to_value(&doc).unwrap();
        note_missing_collections(raw.as_object().unwrap(), &mut report);
        assert!(report.repairs.is_empty());
        assert_eq!(doc, before);
    }

    #[test]
    fn repairs_dangling_active_and_missing_instances() {
        let mut doc = Document::default();
        doc.instances.remove("prs-ce24");
        doc.active_instance_id = "gone".into();
        doc.instances.get_mut("gs-mini").unwrap().id = "wrong".into();
        let mut report = MigrationReport::new(EntryPoint::Current);
        verify(&mut doc, &MigrationOptions::default(), &mut report);
        assert_eq!(doc.active_instance_id, "gs-mini");
        assert_eq!(doc.instances["gs-mini"].id, "gs-mini");
        assert!(doc.instances.contains_key("prs-ce24"));
        assert_eq!(report.repairs.len(), 3);
        assert!(doc.validate().is_ok());

        let mut again = MigrationReport::new(EntryPoint::Current);
        verify(&mut doc, &MigrationOptions::default(), &mut again);
        assert!(again.repairs.is_empty());
    }

    #[test]
    fn notes_missing_collections() {
        let raw = json!({
            "version": 6,
            "guitars": {"gs-mini": {"id": "gs-mini", "humidityReadings": null}}
        });
        let mut report = MigrationReport::new(EntryPoint::Current);
        note_missing_collections(raw.as_object().unwrap(), &mut report);
        let paths: Vec<_> = report.repairs.iter().map(|r| r.path.as_str()).collect();
        assert!(paths.contains(&"syncQueue"));
        assert!(paths.contains(&"inspectionData"));
        assert!(paths.contains(&"guitars.gs-mini.humidityReadings"));
        assert!(paths.contains(&"guitars.gs-mini.inventory"));
        assert_eq!(report.repairs.len(), 2 + INSTANCE_COLLECTIONS.len());
    }
}
