//! Snapshot change detection.
//!
//! Compares two snapshots and decides whether the transition can change any
//! rendered query result.
//!
//! ## Entry points
//!
//! ```
//! use livedata_core::diff::{compute_diff, is_no_op};
//! use livedata_core::model::{House, Snapshot};
//!
//! let before = Snapshot::empty();
//! let after = before.update_houses(|h| h.push(House::new("h1", "1 Main St.", "10001")));
//!
//! assert!(is_no_op(&before, &before.clone()));
//! assert!(!is_no_op(&before, &after));
//! let diff = compute_diff(&before, &after).unwrap();
//! assert!(diff.houses.added.contains("h1"));
//! ```
//!
//! ## Guarantees
//!
//! - **Correct without sharing**: reference equality is only a shortcut; every
//!   level falls back to value equality.
//! - **Order is observable**: a collection whose surviving ids change relative
//!   order is changed even when no entity value differs.
//! - **Embedded references**: a `primaryAddress` whose referenced house changed
//!   in the same transition is reported stale.

pub mod engine;
pub mod human_summary;
pub mod model;

pub use engine::{compute_diff, diff_collection, is_no_op, ChangeDetector};
pub use human_summary::render_human_summary;
pub use model::{CollectionDiff, DiffClassification, SnapshotDiff, StaleCause, StaleRelation};
