//! The versioned document
//!
//! [`Document`] is the single persisted unit: a version tag, a map of
//! equipment instances, a reference to the active one, and a few auxiliary
//! collections that are not tied to any instance.

use crate::error::ModelError;
use crate::instance::{default_catalog, InstanceProfile, InstanceState, DEFAULT_INSTANCE_ID};
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Shape version written by this build
pub const CURRENT_VERSION: u32 = 6;

/// Key, in a document's or an instance's unknown fields, holding input that
/// could not be migrated, by field name
pub const UNMIGRATED_KEY: &str = "unmigrated";

/// Current-version persisted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Shape version; equals [`CURRENT_VERSION`] after any migration or write
    pub version: u32,

    /// Instance currently shown to the user
    #[serde(rename = "activeGuitarId", alias = "activeInstanceId")]
    pub active_instance_id: String,

    /// Instances by id
    #[serde(rename = "guitars", alias = "equipmentInstances")]
    pub instances: BTreeMap<String, InstanceState>,

    /// Changes waiting for an external sync collaborator
    #[serde(rename = "syncQueue", alias = "pendingSyncQueue", default)]
    pub sync_queue: Vec<Value>,

    /// Inspection checklist answers
    #[serde(rename = "inspectionData", default)]
    pub inspection_data: Map<String, Value>,

    /// Fields this version does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Document {
    fn default() -> Self {
        Self::fresh(&default_catalog(), DEFAULT_INSTANCE_ID)
    }
}

impl Document {
    /// Current-version document with a blank instance per catalog entry
    ///
    /// `active` falls back to the first catalog entry when it names none.
    #[must_use]
    pub fn fresh(catalog: &[InstanceProfile], active: &str) -> Self {
        let instances: BTreeMap<String, InstanceState> = catalog
            .iter()
            .map(|profile| (profile.id.clone(), profile.blank_instance()))
            .collect();
        let active_instance_id = if instances.contains_key(active) {
            active.to_string()
        } else {
            catalog
                .first()
                .map_or_else(|| active.to_string(), |p| p.id.clone())
        };
        Self {
            version: CURRENT_VERSION,
            active_instance_id,
            instances,
            sync_queue: Vec::new(),
            inspection_data: Map::new(),
            extra: Map::new(),
        }
    }

    /// Check structural invariants
    ///
    /// # Errors
    /// Returns the first violated invariant
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.instances.is_empty() {
            return Err(ModelError::NoInstances);
        }
        if !self.instances.contains_key(&self.active_instance_id) {
            return Err(ModelError::DanglingActiveInstance(
                self.active_instance_id.clone(),
            ));
        }
        for (key, instance) in &self.instances {
            if !instance.id.is_empty() && instance.id != *key {
                return Err(ModelError::InstanceIdMismatch {
                    key: key.clone(),
                    id: instance.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Instance by id
    #[inline]
    #[must_use]
    pub fn instance(&self, id: &str) -> Option<&InstanceState> {
        self.instances.get(id)
    }

    /// Mutable instance by id
    ///
    /// # Errors
    /// Returns error if no instance has that id
    pub fn instance_mut(&mut self, id: &str) -> Result<&mut InstanceState, ModelError> {
        self.instances
            .get_mut(id)
            .ok_or_else(|| ModelError::UnknownInstance(id.to_string()))
    }

    /// The active instance
    #[must_use]
    pub fn active_instance(&self) -> Option<&InstanceState> {
        self.instances.get(&self.active_instance_id)
    }

    /// The active instance, mutably
    ///
    /// # Errors
    /// Returns error if the active id is dangling
    pub fn active_instance_mut(&mut self) -> Result<&mut InstanceState, ModelError> {
        let id = self.active_instance_id.clone();
        self.instances
            .get_mut(&id)
            .ok_or(ModelError::DanglingActiveInstance(id))
    }

    /// Switch the active instance
    ///
    /// # Errors
    /// Returns error if no instance has that id
    pub fn set_active_instance(&mut self, id: &str) -> Result<(), ModelError> {
        if !self.instances.contains_key(id) {
            return Err(ModelError::UnknownInstance(id.to_string()));
        }
        self.active_instance_id = id.to_string();
        Ok(())
    }

    /// Queue an item for sync, stamped with `queuedAt`
    ///
    /// Non-object items are wrapped as `{"item": ...}`.
    pub fn enqueue_sync(&mut self, item: Value, at: Timestamp) {
        let mut entry = match item {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("item".to_string(), other);
                map
            }
        };
        entry.insert(
            "queuedAt".to_string(),
            serde_json::to_value(at).unwrap_or(Value::Null),
        );
        self.sync_queue.push(Value::Object(entry));
    }

    /// Drop every queued sync item, returning how many there were
    pub fn clear_sync_queue(&mut self) -> usize {
        let count = self.sync_queue.len();
        self.sync_queue.clear();
        count
    }

    /// Resolve a field by its persisted name
    ///
    /// Top-level fields are looked up first, then the same field on the
    /// active instance. Returns `None` when neither has it or it is `null`.
    ///
    /// # Errors
    /// Returns error if the document cannot be represented as JSON
    pub fn resolve_field(&self, name: &str) -> Result<Option<Value>, serde_json::Error> {
        let Value::Object(mut top) = serde_json::to_value(self)? else {
            return Ok(None);
        };
        if let Some(value) = top.remove(name).filter(|v| !v.is_null()) {
            return Ok(Some(value));
        }
        let Some(active) = self.active_instance() else {
            return Ok(None);
        };
        let Value::Object(mut fields) = serde_json::to_value(active)? else {
            return Ok(None);
        };
        Ok(fields.remove(name).filter(|v| !v.is_null()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn fresh_document_is_valid() {
        let doc = Document::default();
        assert_eq!(doc.version, CURRENT_VERSION);
        assert_eq!(doc.active_instance_id, "gs-mini");
        assert_eq!(doc.instances.len(), 2);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn fresh_falls_back_to_first_catalog_entry() {
        let doc = Document::fresh(&default_catalog(), "missing");
        assert_eq!(doc.active_instance_id, "gs-mini");
    }

    #[test]
    fn dangling_active_is_invalid() {
        let mut doc = Document::default();
        doc.active_instance_id = "gone".into();
        assert_eq!(
            doc.validate(),
            Err(ModelError::DanglingActiveInstance("gone".into()))
        );
        assert!(doc.set_active_instance("gone").is_err());
        doc.set_active_instance("prs-ce24").unwrap();
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn persisted_names_and_aliases() {
        let doc = Document::default();
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("guitars").is_some());
        assert_eq!(value["activeGuitarId"], json!("gs-mini"));
        assert_eq!(value["syncQueue"], json!([]));

        let aliased: Document = serde_json::from_value(json!({
            "version": 6,
            "activeInstanceId": "a",
            "equipmentInstances": {"a": {"id": "a", "name": "A"}},
            "pendingSyncQueue": [{"op": "x"}],
            "theme": "dark"
        }))
        .unwrap();
        assert_eq!(aliased.active_instance_id, "a");
        assert_eq!(aliased.sync_queue.len(), 1);
        assert_eq!(aliased.extra.get("theme"), Some(&json!("dark")));
        assert!(aliased.inspection_data.is_empty());
    }

    #[test]
    fn unknown_fields_roundtrip() {
        let mut value = serde_json::to_value(Document::default()).unwrap();
        value["theme"] = json!("dark");
        value["guitars"]["gs-mini"]["strap"] = json!("leather");
        let doc: Document = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), value);
    }

    #[test]
    fn resolve_field_prefers_top_level_then_active_instance() {
        let mut doc = Document::default();
        doc.active_instance_mut().unwrap().onboarding_complete = true;
        assert_eq!(doc.resolve_field("activeGuitarId").unwrap(), Some(json!("gs-mini")));
        assert_eq!(doc.resolve_field("onboardingComplete").unwrap(), Some(json!(true)));
        assert_eq!(doc.resolve_field("nope").unwrap(), None);
        assert_eq!(doc.resolve_field("hasHygrometer").unwrap(), None);
    }

    #[test]
    fn sync_queue_stamps_items() {
        let mut doc = Document::default();
        doc.enqueue_sync(json!({"op": "add"}), Timestamp::Millis(5));
        doc.enqueue_sync(json!("bare"), Timestamp::Millis(6));
        assert_eq!(doc.sync_queue[0], json!({"op": "add", "queuedAt": 5}));
        assert_eq!(doc.sync_queue[1], json!({"item": "bare", "queuedAt": 6}));
        assert_eq!(doc.clear_sync_queue(), 2);
        assert!(doc.sync_queue.is_empty());
    }
}
