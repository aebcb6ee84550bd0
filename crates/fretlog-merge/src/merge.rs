//! Non-destructive merge of two current-version documents

use crate::collections::{
    ItemsById, ReadingsByTimestamp, SessionsByTimestamp, StringChangesByDate, TasksByRecency,
};
use crate::error::{MergeError, Side};
use crate::strategy::{merge_collection, CollectionDelta};
use fretlog_model::{Document, DocumentDigest, InstanceState, CURRENT_VERSION, UNMIGRATED_KEY};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// What merging changed on one instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    /// Humidity readings
    pub humidity_readings: CollectionDelta,
    /// Playing sessions
    pub playing_sessions: CollectionDelta,
    /// String changes
    pub string_change_history: CollectionDelta,
    /// Tasks across every category
    pub tasks: CollectionDelta,
    /// Categories taken whole from the foreign side
    pub categories_added: usize,
    /// Inventory items
    pub inventory: CollectionDelta,
    /// Set-aside input values taken from the foreign side
    pub unmigrated: usize,
}

impl InstanceSummary {
    /// Records appended from the foreign side
    #[must_use]
    pub const fn added(&self) -> usize {
        self.humidity_readings.added
            + self.playing_sessions.added
            + self.string_change_history.added
            + self.tasks.added
            + self.inventory.added
    }

    /// Live records replaced by their foreign copy
    #[must_use]
    pub const fn replaced(&self) -> usize {
        self.tasks.replaced
    }
}

/// Summary of a merge, usable as a preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    /// Per-instance changes, for instances both sides have
    pub instances: BTreeMap<String, InstanceSummary>,
    /// Instances only the foreign side had, taken whole
    pub instances_added: Vec<String>,
    /// Inspection answers only the foreign side had
    pub inspection_keys_added: usize,
    /// Unknown top-level fields only the foreign side had
    pub extra_keys_added: usize,
    /// Document-level set-aside input values taken from the foreign side
    pub unmigrated_added: usize,
    /// Live document digest
    pub live_digest: DocumentDigest,
    /// Foreign document digest
    pub foreign_digest: DocumentDigest,
    /// Merged document digest
    pub merged_digest: DocumentDigest,
}

impl MergeSummary {
    /// Records appended across all instances
    #[must_use]
    pub fn records_added(&self) -> usize {
        self.instances.values().map(InstanceSummary::added).sum()
    }

    /// Tasks replaced by a more recent foreign completion
    #[must_use]
    pub fn records_replaced(&self) -> usize {
        self.instances.values().map(InstanceSummary::replaced).sum()
    }

    /// Whether the merged document equals the live one
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.merged_digest == self.live_digest
    }
}

impl Display for MergeSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "live {} + foreign {} -> {}",
            self.live_digest.short(),
            self.foreign_digest.short(),
            self.merged_digest.short()
        )?;
        if self.is_noop() {
            return writeln!(f, "no change");
        }
        for id in &self.instances_added {
            writeln!(f, "{id}: new instance")?;
        }
        for (id, summary) in &self.instances {
            writeln!(f, "{id}:")?;
            writeln!(f, "  humidityReadings: {}", summary.humidity_readings)?;
            writeln!(f, "  playingSessions: {}", summary.playing_sessions)?;
            writeln!(f, "  stringChangeHistory: {}", summary.string_change_history)?;
            writeln!(f, "  tasks: {} ({} new categories)", summary.tasks, summary.categories_added)?;
            writeln!(f, "  inventory: {}", summary.inventory)?;
        }
        if self.inspection_keys_added > 0 {
            writeln!(f, "inspectionData: +{} answers", self.inspection_keys_added)?;
        }
        let unmigrated = self.unmigrated_added
            + self.instances.values().map(|s| s.unmigrated).sum::<usize>();
        if unmigrated > 0 {
            writeln!(f, "{UNMIGRATED_KEY}: +{unmigrated} values")?;
        }
        Ok(())
    }
}

/// A merged document and what changed
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Union of live and foreign
    pub document: Document,
    /// What the merge did
    pub summary: MergeSummary,
}

fn check(doc: &Document, side: Side) -> Result<(), MergeError> {
    if doc.version != CURRENT_VERSION {
        return Err(MergeError::NotCurrent {
            side,
            found: doc.version,
            expected: CURRENT_VERSION,
        });
    }
    doc.validate()
        .map_err(|source| MergeError::Invalid { side, source })
}

/// Union of `live` and `foreign`
///
/// Neither input is modified. Every live record survives, every foreign
/// record the live side lacks is added, and no key appears twice. The
/// active instance, sync queue and scalar settings stay as they are live.
/// Merging the same foreign document into the result again changes nothing.
///
/// # Errors
/// Returns error if either document is not at the current version or is
/// structurally invalid
pub fn merge_documents(live: &Document, foreign: &Document) -> Result<MergeOutcome, MergeError> {
    check(live, Side::Live)?;
    check(foreign, Side::Foreign)?;

    let mut merged = live.clone();
    let mut instances = BTreeMap::new();
    let mut instances_added = Vec::new();
    for (id, incoming) in &foreign.instances {
        if let Some(existing) = merged.instances.get_mut(id) {
            instances.insert(id.clone(), merge_instance(existing, incoming));
        } else {
            merged.instances.insert(id.clone(), incoming.clone());
            instances_added.push(id.clone());
        }
    }

    let inspection_keys_added = add_missing(&mut merged.inspection_data, &foreign.inspection_data);
    let unmigrated_added = merge_set_aside(&mut merged.extra, &foreign.extra);
    let extra_keys_added = add_missing(&mut merged.extra, &foreign.extra);

    let summary = MergeSummary {
        instances,
        instances_added,
        inspection_keys_added,
        extra_keys_added,
        unmigrated_added,
        live_digest: DocumentDigest::of(live)?,
        foreign_digest: DocumentDigest::of(foreign)?,
        merged_digest: DocumentDigest::of(&merged)?,
    };
    tracing::info!(
        added = summary.records_added(),
        replaced = summary.records_replaced(),
        new_instances = summary.instances_added.len(),
        "merged foreign document"
    );
    Ok(MergeOutcome {
        document: merged,
        summary,
    })
}

/// Fold one foreign instance into its live counterpart
pub fn merge_instance(live: &mut InstanceState, foreign: &InstanceState) -> InstanceSummary {
    let mut summary = InstanceSummary {
        humidity_readings: merge_collection(
            &ReadingsByTimestamp,
            &mut live.humidity_readings,
            &foreign.humidity_readings,
        ),
        playing_sessions: merge_collection(
            &SessionsByTimestamp,
            &mut live.playing_sessions,
            &foreign.playing_sessions,
        ),
        string_change_history: merge_collection(
            &StringChangesByDate,
            &mut live.string_change_history,
            &foreign.string_change_history,
        ),
        inventory: merge_collection(
            &ItemsById,
            &mut live.inventory.items,
            &foreign.inventory.items,
        ),
        unmigrated: merge_set_aside(&mut live.extra, &foreign.extra),
        ..InstanceSummary::default()
    };

    for (category, tasks) in &foreign.maintenance_states {
        if let Some(existing) = live.maintenance_states.get_mut(category) {
            summary.tasks += merge_collection(&TasksByRecency, existing, tasks);
        } else {
            live.maintenance_states.insert(category.clone(), tasks.clone());
            summary.categories_added += 1;
            summary.tasks.added += tasks.len();
        }
    }
    summary
}

/// Union of both sides' set-aside input, field by field
///
/// Values already present live are not added twice.
fn merge_set_aside(target: &mut Map<String, Value>, source: &Map<String, Value>) -> usize {
    let Some(Value::Object(incoming)) = source.get(UNMIGRATED_KEY) else {
        return 0;
    };
    let slot = target
        .entry(UNMIGRATED_KEY.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        let previous = std::mem::replace(slot, Value::Object(Map::new()));
        if let Value::Object(stash) = slot {
            stash.insert("previous".to_string(), previous);
        }
    }
    let Value::Object(stash) = slot else {
        return 0;
    };

    let mut added = 0;
    for (field, values) in incoming {
        let values = match values {
            Value::Array(items) => items.as_slice(),
            other => std::slice::from_ref(other),
        };
        let existing = stash
            .entry(field.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !existing.is_array() {
            let single = existing.take();
            *existing = Value::Array(vec![single]);
        }
        if let Value::Array(existing) = existing {
            for value in values {
                if !existing.contains(value) {
                    existing.push(value.clone());
                    added += 1;
                }
            }
        }
    }
    added
}

fn add_missing(target: &mut Map<String, Value>, source: &Map<String, Value>) -> usize {
    let mut added = 0;
    for (key, value) in source {
        if !target.contains_key(key) {
            target.insert(key.clone(), value.clone());
            added += 1;
        }
    }
    added
}
