//! livedata Core - immutable snapshots, change detection and query execution
//!
//! This crate provides the foundation the live subscription engine is built on:
//! - Structurally shared `Snapshot`s of the houses / jedis state
//! - The `Store`, holding one current snapshot and notifying listeners on replace
//! - The change detector deciding whether a transition is observable
//! - Selection documents, the `QueryExecutor` contract and a built-in executor
//! - Error facility, logging facility and configuration

pub mod config;
pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod query;
pub mod store;

// Used by the exported logging macros
pub use livedata_core_types;

// Re-export commonly used types
pub use config::LiveDataConfig;
pub use diff::{is_no_op, ChangeDetector, SnapshotDiff};
pub use errors::{ExError, ExErrorKind, LiveDataError, Result};
pub use model::{EntityList, House, Jedi, Snapshot};
pub use query::{execute_once, ExecutionResult, FieldError, QueryExecutor, SelectionExecutor};
pub use store::{ListenerHandle, Store};
