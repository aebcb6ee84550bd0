//! Merge strategy trait and core types
//!
//! A [`MergeStrategy`] names the key that identifies "the same record" in
//! one collection and decides which copy wins when both sides have it.
//! [`merge_collection`] applies a strategy to a live and a foreign sequence.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Conflict resolution for one record collection
///
/// # Contract
/// `key` must be deterministic, and `resolve` must return
/// [`Resolution::KeepLive`] when both copies are equal, so that merging the
/// same foreign collection twice changes nothing the second time.
pub trait MergeStrategy: Send + Sync + fmt::Debug {
    /// Record type
    type Record: Clone;

    /// De-duplication key
    type Key: Ord + Clone;

    /// Whether the merged collection is re-sorted ascending by key
    const SORT_AFTER_MERGE: bool = false;

    /// Collection name as persisted
    fn name(&self) -> &'static str;

    /// Key identifying `record` across documents
    fn key(&self, record: &Self::Record) -> Self::Key;

    /// Which copy survives when both sides share a key
    fn resolve(&self, _live: &Self::Record, _foreign: &Self::Record) -> Resolution {
        Resolution::KeepLive
    }
}

/// Outcome of a key collision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Live copy stays
    KeepLive,
    /// Foreign copy replaces the live one
    TakeForeign,
}

/// What a merge did to one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionDelta {
    /// Foreign records appended
    pub added: usize,
    /// Live records replaced by their foreign copy
    pub replaced: usize,
    /// Foreign records whose key the live side already had, live copy kept
    pub kept: usize,
}

impl CollectionDelta {
    /// Whether the collection changed
    #[inline]
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.added > 0 || self.replaced > 0
    }
}

impl std::ops::AddAssign for CollectionDelta {
    fn add_assign(&mut self, other: Self) {
        self.added += other.added;
        self.replaced += other.replaced;
        self.kept += other.kept;
    }
}

impl Display for CollectionDelta {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} added, {} replaced, {} already present",
            self.added, self.replaced, self.kept
        )
    }
}

/// Fold `foreign` into `live` under `strategy`
///
/// Live records are never removed. A foreign record is appended when no
/// live record (or earlier foreign record) shares its key. Duplicates that
/// already exist on the live side are left alone.
pub fn merge_collection<S: MergeStrategy>(
    strategy: &S,
    live: &mut Vec<S::Record>,
    foreign: &[S::Record],
) -> CollectionDelta {
    let mut delta = CollectionDelta::default();
    let mut index: BTreeMap<S::Key, usize> = BTreeMap::new();
    for (position, record) in live.iter().enumerate() {
        index.entry(strategy.key(record)).or_insert(position);
    }

    for record in foreign {
        let key = strategy.key(record);
        if let Some(&position) = index.get(&key) {
            match strategy.resolve(&live[position], record) {
                Resolution::KeepLive => delta.kept += 1,
                Resolution::TakeForeign => {
                    live[position] = record.clone();
                    delta.replaced += 1;
                }
            }
        } else {
            index.insert(key, live.len());
            live.push(record.clone());
            delta.added += 1;
        }
    }

    if S::SORT_AFTER_MERGE {
        live.sort_by(|a, b| strategy.key(a).cmp(&strategy.key(b)));
    }
    tracing::trace!(collection = strategy.name(), %delta, "collection merged");
    delta
}
