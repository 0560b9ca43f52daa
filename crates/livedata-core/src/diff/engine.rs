//! Snapshot change detection.
//!
//! [`is_no_op`] answers the only question a live session must ask before
//! re-executing its query. [`ChangeDetector::detect`] produces the full
//! [`SnapshotDiff`] for logging, validation and callers that want to narrow
//! re-execution.

#![allow(clippy::result_large_err)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::diff::model::{
    CollectionDiff, DiffClassification, SnapshotDiff, StaleCause, StaleRelation,
};
use crate::errors::ExError;
use crate::model::{Entity, EntityList, House, Jedi, Snapshot};
use crate::{log_op_end, log_op_error, log_op_start};

/// Relation field on `Jedi` that embeds a House value
const PRIMARY_ADDRESS: &str = "primaryAddress";

/// Decide whether a transition is unobservable.
///
/// Reference equality on the whole snapshot, then per collection, then per
/// entity; value equality is the fallback at every level, so the answer is
/// correct even when the snapshots share nothing.
pub fn is_no_op(previous: &Snapshot, next: &Snapshot) -> bool {
    if previous.ptr_eq(next) {
        return true;
    }
    previous.houses() == next.houses()
        && previous.jedis() == next.jedis()
        && (Arc::ptr_eq(previous.extensions(), next.extensions())
            || previous.extensions() == next.extensions())
}

/// Diff one ordered, keyed collection.
///
/// Two passes: membership (added / removed / changed ids), then the relative
/// order of the ids present on both sides.
pub fn diff_collection<T: Entity>(previous: &EntityList<T>, next: &EntityList<T>) -> CollectionDiff {
    if previous.ptr_eq(next) {
        return CollectionDiff::default();
    }

    let mut diff = membership_delta(previous, next);
    diff.reordered = positional_reorder(previous, next);

    // Only reachable with repeated ids, which keyed passes cannot see
    if diff.is_empty() && previous != next {
        diff.reordered = true;
    }
    diff
}

/// Pass 1: added, removed and changed ids.
fn membership_delta<T: Entity>(previous: &EntityList<T>, next: &EntityList<T>) -> CollectionDiff {
    let prev_by_id: BTreeMap<&str, &Arc<T>> = previous.iter().rev().map(|e| (e.id(), e)).collect();
    let next_by_id: BTreeMap<&str, &Arc<T>> = next.iter().rev().map(|e| (e.id(), e)).collect();

    let added: BTreeSet<String> = next_by_id
        .keys()
        .filter(|id| !prev_by_id.contains_key(*id))
        .map(|id| id.to_string())
        .collect();
    let removed: BTreeSet<String> = prev_by_id
        .keys()
        .filter(|id| !next_by_id.contains_key(*id))
        .map(|id| id.to_string())
        .collect();
    let changed_ids: BTreeSet<String> = prev_by_id
        .iter()
        .filter_map(|(id, prev)| {
            next_by_id
                .get(id)
                .filter(|next| !(Arc::ptr_eq(prev, next) || prev == *next))
                .map(|_| id.to_string())
        })
        .collect();

    CollectionDiff {
        added,
        removed,
        reordered: false,
        changed_ids,
    }
}

/// Pass 2: do the ids present on both sides keep their relative order?
fn positional_reorder<T: Entity>(previous: &EntityList<T>, next: &EntityList<T>) -> bool {
    let prev_ids: BTreeSet<&str> = previous.ids().collect();
    let next_ids: BTreeSet<&str> = next.ids().collect();

    let surviving_prev = previous.ids().filter(|id| next_ids.contains(id));
    let surviving_next = next.ids().filter(|id| prev_ids.contains(id));
    !surviving_prev.eq(surviving_next)
}

/// Embedded `primaryAddress` references that are stale after this transition.
fn stale_relations(previous: &Snapshot, next: &Snapshot, houses: &CollectionDiff) -> Vec<StaleRelation> {
    if previous.jedis().ptr_eq(next.jedis()) && houses.is_empty() {
        return Vec::new();
    }

    let mut stale = Vec::new();
    for jedi in next.jedis() {
        let Some(prev_jedi) = previous.jedis().find(&jedi.id) else {
            // New entity, reported as added
            continue;
        };
        if let Some(cause) = relation_cause(prev_jedi, jedi, houses) {
            stale.push(StaleRelation {
                jedi_id: jedi.id.clone(),
                field: PRIMARY_ADDRESS,
                house_id: jedi.primary_address_id().map(str::to_string),
                cause,
            });
        }
    }
    stale
}

fn relation_cause(previous: &Jedi, next: &Jedi, houses: &CollectionDiff) -> Option<StaleCause> {
    let reassigned = match (&previous.primary_address, &next.primary_address) {
        (None, None) => false,
        (Some(a), Some(b)) => !(Arc::ptr_eq(a, b) || a == b),
        _ => true,
    };
    if reassigned {
        return Some(StaleCause::Reassigned);
    }
    let house_id = next.primary_address_id()?;
    (houses.changed_ids.contains(house_id) || houses.removed.contains(house_id))
        .then_some(StaleCause::TargetChanged)
}

fn extension_changes(previous: &Snapshot, next: &Snapshot) -> BTreeSet<String> {
    if Arc::ptr_eq(previous.extensions(), next.extensions()) {
        return BTreeSet::new();
    }
    let keys: BTreeSet<&String> = previous
        .extensions()
        .keys()
        .chain(next.extensions().keys())
        .collect();
    keys.into_iter()
        .filter(|k| previous.extension(k) != next.extension(k))
        .cloned()
        .collect()
}

/// Configurable change detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeDetector {
    validate_snapshots: bool,
    track_relations: bool,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self {
            validate_snapshots: true,
            track_relations: true,
        }
    }
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check id uniqueness of every collection that changed
    pub fn with_validation(mut self, validate_snapshots: bool) -> Self {
        self.validate_snapshots = validate_snapshots;
        self
    }

    /// Report stale embedded references
    pub fn with_relation_tracking(mut self, track_relations: bool) -> Self {
        self.track_relations = track_relations;
        self
    }

    pub fn validates_snapshots(&self) -> bool {
        self.validate_snapshots
    }

    /// Validate a snapshot that did not come through [`ChangeDetector::detect`]
    ///
    /// # Errors
    ///
    /// `DuplicateEntityId` when validation is enabled and a collection repeats an id.
    pub fn check(&self, snapshot: &Snapshot) -> Result<(), ExError> {
        if self.validate_snapshots {
            snapshot
                .validate()
                .map_err(|e| ExError::from(e).with_op("snapshot_validate"))?;
        }
        Ok(())
    }

    /// Compute the structured diff between two snapshots
    ///
    /// # Errors
    ///
    /// - `DuplicateEntityId`: validation is enabled and a changed collection
    ///   in `next` repeats an id
    pub fn detect(&self, previous: &Snapshot, next: &Snapshot) -> Result<SnapshotDiff, ExError> {
        if previous.ptr_eq(next) {
            return Ok(SnapshotDiff::identical());
        }

        log_op_start!("snapshot_diff");
        let start = std::time::Instant::now();

        let result = self.detect_changed(previous, next);

        let elapsed = start.elapsed().as_millis() as u64;
        match &result {
            Ok(diff) => log_op_end!(
                "snapshot_diff",
                duration_ms = elapsed,
                classification = ?diff.classification,
                houses_changed = diff.houses.changed_ids.len(),
                jedis_changed = diff.jedis.changed_ids.len(),
            ),
            Err(e) => {
                let e_clone = e.clone();
                log_op_error!("snapshot_diff", e_clone, duration_ms = elapsed);
            }
        }
        result
    }

    fn detect_changed(&self, previous: &Snapshot, next: &Snapshot) -> Result<SnapshotDiff, ExError> {
        if self.validate_snapshots {
            validate_if_changed(previous.houses(), next.houses())?;
            validate_if_changed(previous.jedis(), next.jedis())?;
        }

        let houses = diff_collection::<House>(previous.houses(), next.houses());
        let jedis = diff_collection::<Jedi>(previous.jedis(), next.jedis());
        let stale = if self.track_relations {
            stale_relations(previous, next, &houses)
        } else {
            Vec::new()
        };
        let extensions_changed = extension_changes(previous, next);

        let changed = !houses.is_empty()
            || !jedis.is_empty()
            || !stale.is_empty()
            || !extensions_changed.is_empty();

        Ok(SnapshotDiff {
            classification: if changed {
                DiffClassification::Changed
            } else {
                DiffClassification::NoObservableChange
            },
            houses,
            jedis,
            stale_relations: stale,
            extensions_changed,
        })
    }
}

fn validate_if_changed<T: Entity>(previous: &EntityList<T>, next: &EntityList<T>) -> Result<(), ExError> {
    if previous.ptr_eq(next) {
        return Ok(());
    }
    next.validate_unique_ids()
        .map_err(|e| ExError::from(e).with_op("snapshot_diff"))
}

/// Compute the structured diff with the default detector
///
/// # Errors
///
/// See [`ChangeDetector::detect`].
pub fn compute_diff(previous: &Snapshot, next: &Snapshot) -> Result<SnapshotDiff, ExError> {
    ChangeDetector::default().detect(previous, next)
}
