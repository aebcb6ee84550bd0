//! Task id remapping
//!
//! Ids are translated through an explicit table: exact matches first, then
//! prefix rewrites. Ids matched by neither pass through unchanged so custom
//! tasks survive every remap.

use fretlog_model::{TaskCategory, TaskRecord, TaskTable};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Static id translation table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdRemap {
    exact: BTreeMap<String, String>,
    prefixes: Vec<(String, String)>,
}

impl IdRemap {
    /// Empty table; every id passes through
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map one id exactly
    #[must_use]
    pub fn with_exact(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.exact.insert(from.into(), to.into());
        self
    }

    /// Rewrite a leading prefix
    #[must_use]
    pub fn with_prefix(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.prefixes.push((from.into(), to.into()));
        self
    }

    /// Pre-versioning six-week ids (`6w-N`) to eight-week ids (`8w-N`)
    #[must_use]
    pub fn six_week_rename() -> Self {
        Self::new().with_prefix("6w-", "8w-")
    }

    /// Single-instance ids to ids namespaced by `instance`
    ///
    /// `daily-1..3`, `weekly-1..3`, `8w-1..8`, `q-1..3` and `annual-1` are
    /// the tasks that existed before instances did.
    #[must_use]
    pub fn namespaced(instance: &str) -> Self {
        let groups: [(&str, &str, u32); 5] = [
            ("daily-", "daily-", 3),
            ("weekly-", "weekly-", 3),
            ("8w-", "string-", 8),
            ("q-", "quarterly-", 3),
            ("annual-", "annual-", 1),
        ];
        let mut remap = Self::new();
        for (old, new, count) in groups {
            for n in 1..=count {
                remap = remap.with_exact(format!("{old}{n}"), format!("{instance}-{new}{n}"));
            }
        }
        remap
    }

    /// Translate one id
    #[must_use]
    pub fn apply<'a>(&self, id: &'a str) -> Cow<'a, str> {
        if let Some(to) = self.exact.get(id) {
            return Cow::Owned(to.clone());
        }
        for (from, to) in &self.prefixes {
            if let Some(rest) = id.strip_prefix(from.as_str()) {
                return Cow::Owned(format!("{to}{rest}"));
            }
        }
        Cow::Borrowed(id)
    }

    /// Whether `id` has an entry
    #[must_use]
    pub fn translates(&self, id: &str) -> bool {
        self.exact.contains_key(id) || self.prefixes.iter().any(|(from, _)| id.starts_with(from.as_str()))
    }

    /// Exact entries
    pub fn exact_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.exact.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Translate every id in a task table, returning how many changed
    pub fn apply_to_table(&self, table: &mut TaskTable) -> usize {
        let mut changed = 0;
        for task in table.values_mut().flatten() {
            let new_id = self.apply(&task.id).into_owned();
            if new_id != task.id {
                task.id = new_id;
                changed += 1;
            }
        }
        changed
    }
}

/// Rename the pre-versioning `sixweek` category and `6w-N` ids
///
/// Renamed tasks follow any already under `eightweek`. A task whose new id
/// is taken folds into the existing one, keeping the more recent completion.
#[must_use]
pub fn normalize_six_week(table: TaskTable) -> TaskTable {
    let remap = IdRemap::six_week_rename();
    let six_week = TaskCategory::Other("sixweek".to_string());
    let mut normalized = TaskTable::new();
    for (category, tasks) in table {
        let category = if category == six_week {
            TaskCategory::EightWeek
        } else {
            category
        };
        let existing = normalized.entry(category).or_default();
        for mut task in tasks {
            task.id = remap.apply(&task.id).into_owned();
            fold_task(existing, task);
        }
    }
    normalized
}

/// Add `task`, or keep the more recent completion when its id is taken
pub(crate) fn fold_task(tasks: &mut Vec<TaskRecord>, task: TaskRecord) {
    match tasks.iter_mut().find(|t| t.id == task.id) {
        None => tasks.push(task),
        Some(current) if task.completed_after(current) => {
            current.completed = task.completed;
            current.last_completed = task.last_completed;
        }
        Some(_) => {}
    }
}
