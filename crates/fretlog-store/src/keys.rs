//! Storage key table

use serde::{Deserialize, Serialize};

/// Key names of every persisted entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    /// Unified versioned document
    pub unified: String,
    /// Pre-consolidation per-feature keys
    pub legacy: LegacyKeys,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            unified: "guitarTrackerData".to_string(),
            legacy: LegacyKeys::default(),
        }
    }
}

impl StorageKeys {
    /// Use a different key for the unified document
    #[inline]
    #[must_use]
    pub fn with_unified(mut self, key: impl Into<String>) -> Self {
        self.unified = key.into();
        self
    }
}

/// Pre-consolidation key names
///
/// The first three predate versioning altogether; the rest held single
/// features until the document absorbed them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyKeys {
    /// Task table by category
    pub maintenance: String,
    /// Reading array
    pub humidity: String,
    /// Inspection answers
    pub inspection: String,
    /// `"true"` / `"false"`
    pub onboarding_complete: String,
    /// Plain string
    pub playing_frequency: String,
    /// Decimal string
    pub playing_hours_per_week: String,
    /// `"true"` / `"false"`
    pub has_hygrometer: String,
    /// Session array
    pub playing_sessions: String,
    /// String change array
    pub string_change_history: String,
}

impl Default for LegacyKeys {
    fn default() -> Self {
        Self {
            maintenance: "guitarMaintenanceData".to_string(),
            humidity: "humidityReadings".to_string(),
            inspection: "inspectionData".to_string(),
            onboarding_complete: "onboardingComplete".to_string(),
            playing_frequency: "playingFrequency".to_string(),
            playing_hours_per_week: "playingHoursPerWeek".to_string(),
            has_hygrometer: "hasHygrometer".to_string(),
            playing_sessions: "playingSessions".to_string(),
            string_change_history: "stringChangeHistory".to_string(),
        }
    }
}
