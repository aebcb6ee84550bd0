//! Maintenance tasks
//!
//! Task state is kept per category as a list of [`TaskRecord`]s. Category
//! names are open-ended; the known ones get their own variants so that
//! tables iterate in schedule order.

use crate::serde_util::null_as_default;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Schedule bucket a task belongs to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskCategory {
    /// Every playing day
    Daily,
    /// Once a week
    Weekly,
    /// Every string change (eight weeks by default)
    EightWeek,
    /// Once a month
    Monthly,
    /// Every three months
    Quarterly,
    /// Once a year
    Annual,
    /// Any other persisted category name
    Other(String),
}

impl TaskCategory {
    /// Persisted name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::EightWeek => "eightweek",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for TaskCategory {
    fn from(name: &str) -> Self {
        match name {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "eightweek" => Self::EightWeek,
            "monthly" => Self::Monthly,
            "quarterly" => Self::Quarterly,
            "annual" => Self::Annual,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for TaskCategory {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<TaskCategory> for String {
    fn from(category: TaskCategory) -> Self {
        category.as_str().to_string()
    }
}

impl Display for TaskCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion state of one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Task id, unique within its category
    pub id: String,

    /// Whether the task is currently checked off
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,

    /// When the task was last completed
    #[serde(default)]
    pub last_completed: Option<Timestamp>,

    /// Fields this version does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskRecord {
    /// Unchecked task with no history
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            completed: false,
            last_completed: None,
            extra: Map::new(),
        }
    }

    /// Mark complete at `at`
    #[inline]
    #[must_use]
    pub fn completed_at(mut self, at: Timestamp) -> Self {
        self.completed = true;
        self.last_completed = Some(at);
        self
    }

    /// Whether this record was completed more recently than `other`
    ///
    /// A record with no completion time is never more recent.
    #[must_use]
    pub fn completed_after(&self, other: &Self) -> bool {
        match (&self.last_completed, &other.last_completed) {
            (Some(mine), Some(theirs)) => mine.is_after(theirs),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Task records grouped by category
pub type TaskTable = BTreeMap<TaskCategory, Vec<TaskRecord>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names_roundtrip() {
        for name in ["daily", "weekly", "eightweek", "monthly", "quarterly", "annual", "sixweek"] {
            assert_eq!(TaskCategory::from(name).as_str(), name);
        }
        assert_eq!(
            TaskCategory::from("sixweek"),
            TaskCategory::Other("sixweek".to_string())
        );
    }

    #[test]
    fn table_iterates_in_schedule_order() {
        let mut table = TaskTable::new();
        table.insert(TaskCategory::Annual, vec![]);
        table.insert(TaskCategory::Daily, vec![]);
        table.insert(TaskCategory::EightWeek, vec![]);
        let order: Vec<_> = table.keys().map(TaskCategory::as_str).collect();
        assert_eq!(order, ["daily", "eightweek", "annual"]);
    }

    #[test]
    fn null_completed_reads_as_false() {
        let record: TaskRecord =
            serde_json::from_str(r#"{"id":"daily-1","completed":null,"note":"x"}"#).unwrap();
        assert!(!record.completed);
        assert_eq!(record.extra.get("note"), Some(&Value::from("x")));
    }

    #[test]
    fn completion_recency() {
        let old = TaskRecord::new("a").completed_at(Timestamp::Text("2024-01-01".into()));
        let new = TaskRecord::new("a").completed_at(Timestamp::Text("2024-02-01".into()));
        let never = TaskRecord::new("a");
        assert!(new.completed_after(&old));
        assert!(!old.completed_after(&new));
        assert!(old.completed_after(&never));
        assert!(!never.completed_after(&never));
    }
}
