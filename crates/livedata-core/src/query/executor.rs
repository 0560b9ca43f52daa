//! Query execution contract.
//!
//! A [`QueryExecutor`] renders one result from one snapshot. `Ok` results may
//! still carry field-level [`FieldError`]s; `Err` is a fatal, document-level
//! failure.

#![allow(clippy::result_large_err)]

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::errors::ExError;
use crate::model::Snapshot;
use crate::store::Store;
use crate::{log_op_end, log_op_error, log_op_start};

/// One segment of a response path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{k}"),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// A non-fatal error attached to one response path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub message: String,
    pub path: Vec<PathSegment>,
}

impl FieldError {
    pub fn new(message: impl Into<String>, path: Vec<PathSegment>) -> Self {
        Self {
            message: message.into(),
            path,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: Vec<String> = self.path.iter().map(ToString::to_string).collect();
        write!(f, "{} (at {})", self.message, path.join("."))
    }
}

/// Rendered output of one execution, in the GraphQL response shape
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExecutionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl ExecutionResult {
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = errors;
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Serialize to response JSON
    ///
    /// # Errors
    ///
    /// `Serialization` if the data cannot be encoded.
    pub fn to_json(&self) -> Result<String, ExError> {
        serde_json::to_string(self).map_err(|e| ExError::from(crate::errors::LiveDataError::from(e)))
    }
}

/// Renders a result from a snapshot
pub trait QueryExecutor: Send + Sync {
    /// Execute against one snapshot
    ///
    /// # Errors
    ///
    /// Fatal, document-level failures only. Field-level failures belong in
    /// [`ExecutionResult::errors`].
    fn execute(&self, snapshot: &Snapshot) -> Result<ExecutionResult, ExError>;
}

impl<F> QueryExecutor for F
where
    F: Fn(&Snapshot) -> Result<ExecutionResult, ExError> + Send + Sync,
{
    fn execute(&self, snapshot: &Snapshot) -> Result<ExecutionResult, ExError> {
        self(snapshot)
    }
}

/// Execute with `query_execute` boundary logging
///
/// # Errors
///
/// Whatever the executor returns.
pub fn execute_logged<E>(executor: &E, snapshot: &Snapshot) -> Result<ExecutionResult, ExError>
where
    E: QueryExecutor + ?Sized,
{
    log_op_start!(
        "query_execute",
        houses_len = snapshot.houses().len(),
        jedis_len = snapshot.jedis().len()
    );
    let start = std::time::Instant::now();

    let result = executor.execute(snapshot);

    let elapsed = start.elapsed().as_millis() as u64;
    match &result {
        Ok(r) => log_op_end!("query_execute", duration_ms = elapsed, field_errors = r.errors.len()),
        Err(e) => {
            let e_clone = e.clone();
            log_op_error!("query_execute", e_clone, duration_ms = elapsed);
        }
    }
    result
}

/// One-shot execution against the store's current snapshot
///
/// # Errors
///
/// Whatever the executor returns.
pub fn execute_once<E>(store: &Store, executor: &E) -> Result<ExecutionResult, ExError>
where
    E: QueryExecutor + ?Sized,
{
    execute_logged(executor, &store.current())
}
