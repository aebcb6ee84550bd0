//! Model errors

use crate::task::TaskCategory;

/// Errors raised by document validation and instance-level operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Document has no equipment instances
    #[error("document has no equipment instances")]
    NoInstances,

    /// Active instance id names no instance in the document
    #[error("active instance `{0}` does not exist")]
    DanglingActiveInstance(String),

    /// Map key and embedded instance id disagree
    #[error("instance stored under `{key}` carries id `{id}`")]
    InstanceIdMismatch {
        /// Map key
        key: String,
        /// Embedded id
        id: String,
    },

    /// No instance with the given id
    #[error("unknown instance `{0}`")]
    UnknownInstance(String),

    /// Humidity outside 0..=100
    #[error("humidity {0} is outside 0..=100")]
    HumidityOutOfRange(f64),

    /// Non-finite numeric input
    #[error("{field} must be a finite number")]
    NotFinite {
        /// Offending field
        field: &'static str,
    },

    /// No reading with the given id
    #[error("no humidity reading with id {0}")]
    UnknownReading(i64),

    /// No task with the given id in the category
    #[error("no task `{id}` in category `{category}`")]
    UnknownTask {
        /// Task category
        category: TaskCategory,
        /// Task id
        id: String,
    },

    /// No inventory item with the given id
    #[error("no inventory item `{0}`")]
    UnknownItem(String),

    /// Inventory id already taken
    #[error("inventory item `{0}` already exists")]
    DuplicateItem(String),

    /// Count would drop below zero
    #[error("inventory item `{0}` is already at zero")]
    InventoryExhausted(String),

    /// Timer started while running
    #[error("timer is already running")]
    TimerRunning,

    /// Timer stopped while idle
    #[error("timer is not running")]
    TimerIdle,
}

impl ModelError {
    /// Whether the error concerns document structure rather than an operation argument
    #[inline]
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::NoInstances | Self::DanglingActiveInstance(_) | Self::InstanceIdMismatch { .. }
        )
    }
}
