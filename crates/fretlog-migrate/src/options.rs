//! Engine options

use fretlog_model::{default_catalog, InstanceProfile, DEFAULT_INSTANCE_ID};
use fretlog_store::LegacyKeys;

/// Strings assumed fitted when history predates string tracking
pub const DEFAULT_STRING_TYPE: &str = "D'Addario EJ16 Phosphor Bronze Light (.012-.053)";

/// Inputs the steps need besides the document itself
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOptions {
    /// Instances every current document carries
    pub catalog: Vec<InstanceProfile>,
    /// Instance that inherits single-instance history
    pub default_instance: String,
    /// `currentStringType` filled in by the consolidation step
    pub default_string_type: String,
    /// Legacy key names, for warnings
    pub legacy_keys: LegacyKeys,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            default_instance: DEFAULT_INSTANCE_ID.to_string(),
            default_string_type: DEFAULT_STRING_TYPE.to_string(),
            legacy_keys: LegacyKeys::default(),
        }
    }
}

impl MigrationOptions {
    /// Replace the instance catalog
    #[inline]
    #[must_use]
    pub fn with_catalog(mut self, catalog: Vec<InstanceProfile>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Change the instance that inherits single-instance history
    #[inline]
    #[must_use]
    pub fn with_default_instance(mut self, id: impl Into<String>) -> Self {
        self.default_instance = id.into();
        self
    }

    /// Change the string type filled in by consolidation
    #[inline]
    #[must_use]
    pub fn with_default_string_type(mut self, strings: impl Into<String>) -> Self {
        self.default_string_type = strings.into();
        self
    }

    /// Use different legacy key names
    #[inline]
    #[must_use]
    pub fn with_legacy_keys(mut self, keys: LegacyKeys) -> Self {
        self.legacy_keys = keys;
        self
    }

    /// Catalog entry for the default instance
    #[must_use]
    pub fn default_profile(&self) -> Option<&InstanceProfile> {
        self.catalog.iter().find(|p| p.id == self.default_instance)
    }
}
