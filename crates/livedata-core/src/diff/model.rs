//! Snapshot diff output types.
//!
//! Id sets use `BTreeSet` so that serialized diffs (and log output built from
//! them) are deterministic.

use serde::Serialize;
use std::collections::BTreeSet;

/// The top-level verdict between two snapshots.
///
/// All collection sub-structs are populated even when nothing changed so
/// that callers can inspect them uniformly.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// High-level classification of the transition
    pub classification: DiffClassification,
    /// Changes to the `houses` collection
    pub houses: CollectionDiff,
    /// Changes to the `jedis` collection
    pub jedis: CollectionDiff,
    /// Embedded references that must be re-resolved against the next snapshot
    pub stale_relations: Vec<StaleRelation>,
    /// Extension keys added, removed or rewritten
    pub extensions_changed: BTreeSet<String>,
}

impl SnapshotDiff {
    /// Diff for two reference-identical snapshots
    pub fn identical() -> Self {
        Self {
            classification: DiffClassification::Identical,
            houses: CollectionDiff::default(),
            jedis: CollectionDiff::default(),
            stale_relations: Vec::new(),
            extensions_changed: BTreeSet::new(),
        }
    }

    /// True when the transition cannot change any rendered result
    pub fn is_no_op(&self) -> bool {
        self.classification != DiffClassification::Changed
    }
}

/// High-level classification of a snapshot transition.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum DiffClassification {
    /// Both snapshots are the same reference
    Identical,
    /// Different references, but every collection, relation and extension is
    /// value-equal
    NoObservableChange,
    /// At least one observable difference
    Changed,
}

/// Changes to one ordered, keyed collection.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CollectionDiff {
    /// Ids present in next but not in previous
    pub added: BTreeSet<String>,
    /// Ids present in previous but not in next
    pub removed: BTreeSet<String>,
    /// True if the surviving ids appear in a different relative order
    pub reordered: bool,
    /// Ids present in both whose entity value differs
    pub changed_ids: BTreeSet<String>,
}

impl CollectionDiff {
    /// True when the collection contributes no change
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && !self.reordered && self.changed_ids.is_empty()
    }
}

/// Why an embedded reference is stale.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum StaleCause {
    /// The reference itself was reassigned, including null <-> non-null
    Reassigned,
    /// Same referenced id, but the referenced entity changed in this transition
    TargetChanged,
}

/// An embedded reference whose previously rendered value can no longer be trusted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StaleRelation {
    /// Owning entity
    pub jedi_id: String,
    /// Relation field name as exposed by the schema
    pub field: &'static str,
    /// Referenced house id in the next snapshot (None when nulled)
    pub house_id: Option<String>,
    pub cause: StaleCause,
}
