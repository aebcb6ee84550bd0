//! Migration report

use crate::error::{MigrationError, MigrationWarning};
use std::fmt::{self, Display, Formatter};

/// Where the engine entered the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// Stored document was already at the current version
    Current,
    /// Stored document carried an older version tag
    Stale {
        /// Version found
        from: u32,
    },
    /// Synthesized from pre-consolidation keys
    Legacy,
    /// Nothing stored anywhere
    Fresh,
    /// Stored data could not be migrated; default substituted
    Fallback,
}

impl Display for EntryPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::Stale { from } => write!(f, "stale (v{from})"),
            Self::Legacy => f.write_str("legacy keys"),
            Self::Fresh => f.write_str("fresh"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// One step that ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedStep {
    /// Source version
    pub from: u32,
    /// Destination version
    pub to: u32,
    /// What the step does
    pub description: &'static str,
}

/// One fix made by the integrity check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    /// Dotted path of what was fixed
    pub path: String,
    /// What was done
    pub action: String,
}

impl Repair {
    /// New repair entry
    pub fn new(path: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            action: action.into(),
        }
    }
}

/// Everything the engine did to produce a document
#[derive(Debug)]
pub struct MigrationReport {
    /// How the chain was entered
    pub entry: EntryPoint,
    /// Steps in the order applied
    pub steps: Vec<AppliedStep>,
    /// Recovered problems
    pub warnings: Vec<MigrationWarning>,
    /// Integrity repairs
    pub repairs: Vec<Repair>,
    /// Why the default document was substituted
    pub fallback: Option<MigrationError>,
}

impl MigrationReport {
    /// Empty report for an entry point
    #[must_use]
    pub const fn new(entry: EntryPoint) -> Self {
        Self {
            entry,
            steps: Vec::new(),
            warnings: Vec::new(),
            repairs: Vec::new(),
            fallback: None,
        }
    }

    /// Record a warning and log it; repeats are dropped
    pub fn warn(&mut self, warning: MigrationWarning) {
        if self.warnings.contains(&warning) {
            return;
        }
        tracing::warn!(%warning, "migration recovered malformed data");
        self.warnings.push(warning);
    }

    /// Record a repair and log it
    pub fn repair(&mut self, path: impl Into<String>, action: impl Into<String>) {
        let repair = Repair::new(path, action);
        tracing::info!(path = %repair.path, action = %repair.action, "integrity repair");
        self.repairs.push(repair);
    }

    /// Whether the returned document differs from what is stored
    ///
    /// False for a fallback: the stored text is left for the caller to decide on.
    #[must_use]
    pub fn needs_persist(&self) -> bool {
        match self.entry {
            EntryPoint::Current => !self.repairs.is_empty() || !self.warnings.is_empty(),
            EntryPoint::Stale { .. } | EntryPoint::Legacy | EntryPoint::Fresh => true,
            EntryPoint::Fallback => false,
        }
    }

    /// Whether the stored data was replaced by the default document
    #[inline]
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self.entry, EntryPoint::Fallback)
    }

    /// Versions the chain passed through, starting version first
    #[must_use]
    pub fn path(&self) -> Vec<u32> {
        let mut path: Vec<u32> = self.steps.first().map(|s| s.from).into_iter().collect();
        path.extend(self.steps.iter().map(|s| s.to));
        path
    }
}

impl Display for MigrationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "entry: {}", self.entry)?;
        for step in &self.steps {
            writeln!(f, "step: v{} -> v{} ({})", step.from, step.to, step.description)?;
        }
        for warning in &self.warnings {
            writeln!(f, "warning: {warning}")?;
        }
        for repair in &self.repairs {
            writeln!(f, "repair: {} ({})", repair.path, repair.action)?;
        }
        if let Some(cause) = &self.fallback {
            writeln!(f, "fallback: {cause}")?;
        }
        Ok(())
    }
}
