//! Query documents and their execution over snapshots.

pub mod document;
pub mod executor;
pub mod resolve;
pub mod schema;

pub use document::{parse_document, Document, OperationKind, Selection};
pub use executor::{execute_logged, execute_once, ExecutionResult, FieldError, PathSegment, QueryExecutor};
pub use resolve::SelectionExecutor;
