//! Legacy key reader
//!
//! Reads the per-feature entries that existed before state was unified into
//! one document. Values are returned as the raw text found; interpreting
//! them belongs to the migration engine. Nothing here writes.

use crate::error::StoreError;
use crate::keys::LegacyKeys;
use crate::kv::KeyValueStore;

/// Raw text of every legacy key, as found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacySnapshot {
    /// Task table (v1)
    pub maintenance: Option<String>,
    /// Reading array (v1)
    pub humidity: Option<String>,
    /// Inspection answers (v1)
    pub inspection: Option<String>,
    /// Onboarding flag (v2 era)
    pub onboarding_complete: Option<String>,
    /// Playing frequency (v2 era)
    pub playing_frequency: Option<String>,
    /// Playing hours (v2 era)
    pub playing_hours_per_week: Option<String>,
    /// Hygrometer flag (v2 era)
    pub has_hygrometer: Option<String>,
    /// Session array (v2 era)
    pub playing_sessions: Option<String>,
    /// String change array (v2 era)
    pub string_change_history: Option<String>,
}

impl LegacySnapshot {
    /// Read every legacy key from `store`
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub fn read<S: KeyValueStore + ?Sized>(store: &S, keys: &LegacyKeys) -> Result<Self, StoreError> {
        let snapshot = Self {
            maintenance: store.get(&keys.maintenance)?,
            humidity: store.get(&keys.humidity)?,
            inspection: store.get(&keys.inspection)?,
            onboarding_complete: store.get(&keys.onboarding_complete)?,
            playing_frequency: store.get(&keys.playing_frequency)?,
            playing_hours_per_week: store.get(&keys.playing_hours_per_week)?,
            has_hygrometer: store.get(&keys.has_hygrometer)?,
            playing_sessions: store.get(&keys.playing_sessions)?,
            string_change_history: store.get(&keys.string_change_history)?,
        };
        tracing::debug!(
            v1 = snapshot.has_unversioned_data(),
            present = snapshot.present_count(),
            "legacy keys read"
        );
        Ok(snapshot)
    }

    /// Whether any pre-versioning key (task table, readings, inspection) is present
    #[must_use]
    pub const fn has_unversioned_data(&self) -> bool {
        self.maintenance.is_some() || self.humidity.is_some() || self.inspection.is_some()
    }

    /// Number of keys present
    #[must_use]
    pub fn present_count(&self) -> usize {
        [
            &self.maintenance,
            &self.humidity,
            &self.inspection,
            &self.onboarding_complete,
            &self.playing_frequency,
            &self.playing_hours_per_week,
            &self.has_hygrometer,
            &self.playing_sessions,
            &self.string_change_history,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }

    /// Whether no legacy key is present
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    #[test]
    fn reads_only_what_is_there() {
        let store = MemoryStore::with_entries([
            ("guitarMaintenanceData", r#"{"daily":[]}"#),
            ("playingFrequency", "daily"),
            ("unrelated", "x"),
        ]);
        let snapshot = LegacySnapshot::read(&store, &LegacyKeys::default()).unwrap();
        assert_eq!(snapshot.maintenance.as_deref(), Some(r#"{"daily":[]}"#));
        assert_eq!(snapshot.playing_frequency.as_deref(), Some("daily"));
        assert!(snapshot.humidity.is_none());
        assert!(snapshot.has_unversioned_data());
        assert_eq!(snapshot.present_count(), 2);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn feature_keys_alone_are_not_unversioned_data() {
        let store = MemoryStore::with_entries([("onboardingComplete", "true")]);
        let snapshot = LegacySnapshot::read(&store, &LegacyKeys::default()).unwrap();
        assert!(!snapshot.has_unversioned_data());
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn empty_store_gives_empty_snapshot() {
        let snapshot = LegacySnapshot::read(&MemoryStore::new(), &LegacyKeys::default()).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot, LegacySnapshot::default());
    }
}
