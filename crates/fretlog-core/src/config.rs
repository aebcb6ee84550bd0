//! Tracker configuration
//!
//! Every field is optional in a TOML file; anything left out keeps its
//! built-in default.
//!
//! ```toml
//! default_instance = "gs-mini"
//! default_string_type = "Elixir Nanoweb 80/20 Light"
//!
//! [storage]
//! unified = "guitarTrackerData"
//!
//! [storage.legacy]
//! maintenance = "guitarMaintenanceData"
//!
//! [[catalog]]
//! id = "gs-mini"
//! name = "Taylor GS Mini Sapele"
//! categories = ["daily", "weekly", "eightweek", "quarterly", "annual"]
//! ```

use crate::error::TrackerError;
use fretlog_migrate::{MigrationOptions, DEFAULT_STRING_TYPE};
use fretlog_model::{default_catalog, InstanceProfile, DEFAULT_INSTANCE_ID};
use fretlog_store::StorageKeys;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Key names of every persisted entry
    pub storage: StorageKeys,
    /// Instance that inherits single-instance history
    pub default_instance: String,
    /// `currentStringType` assumed for history that predates it
    pub default_string_type: String,
    /// Instances every document carries
    pub catalog: Vec<InstanceProfile>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            storage: StorageKeys::default(),
            default_instance: DEFAULT_INSTANCE_ID.to_string(),
            default_string_type: DEFAULT_STRING_TYPE.to_string(),
            catalog: default_catalog(),
        }
    }
}

impl TrackerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this shape
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, TrackerError> {
        toml::from_str(text).map_err(|e| TrackerError::config(origin, e.to_string()))
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, TrackerError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TrackerError::config(path, e.to_string()))?;
        let config = Self::from_toml(&text, path)?;
        tracing::debug!(path = %path.display(), instances = config.catalog.len(), "configuration loaded");
        Ok(config)
    }

    /// With storage keys
    #[inline]
    #[must_use]
    pub fn with_storage(mut self, storage: StorageKeys) -> Self {
        self.storage = storage;
        self
    }

    /// With default instance
    #[inline]
    #[must_use]
    pub fn with_default_instance(mut self, id: impl Into<String>) -> Self {
        self.default_instance = id.into();
        self
    }

    /// With default string type
    #[inline]
    #[must_use]
    pub fn with_default_string_type(mut self, strings: impl Into<String>) -> Self {
        self.default_string_type = strings.into();
        self
    }

    /// With instance catalog
    #[inline]
    #[must_use]
    pub fn with_catalog(mut self, catalog: Vec<InstanceProfile>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Options for the migration engine
    #[must_use]
    pub fn migration_options(&self) -> MigrationOptions {
        MigrationOptions::default()
            .with_catalog(self.catalog.clone())
            .with_default_instance(self.default_instance.clone())
            .with_default_string_type(self.default_string_type.clone())
            .with_legacy_keys(self.storage.legacy.clone())
    }
}
