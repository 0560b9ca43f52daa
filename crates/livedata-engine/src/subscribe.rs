//! Entry points pairing a store with a query.

#![allow(clippy::result_large_err)]

use std::sync::Arc;

use livedata_core::errors::{ExError, ExErrorKind};
use livedata_core::query::{execute_once, ExecutionResult, OperationKind, QueryExecutor, SelectionExecutor};
use livedata_core::{LiveDataConfig, Store};

use crate::session::LiveSubscription;

/// Open a live subscription driven by `executor`
///
/// Nothing runs until the first pull.
pub fn subscribe<E>(store: &Store, executor: E) -> LiveSubscription
where
    E: QueryExecutor + 'static,
{
    LiveSubscription::new(store, executor)
}

/// Parse, validate and subscribe to a subscription document
///
/// # Errors
///
/// - `InvalidDocument`: syntax error, or the operation is not a subscription
/// - `UnknownField`: the document selects a field the schema lacks
pub fn subscribe_document(store: &Store, source: &str) -> Result<LiveSubscription, ExError> {
    subscribe_document_with_config(store, source, &LiveDataConfig::default())
}

/// [`subscribe_document`] honouring `config`
///
/// # Errors
///
/// See [`subscribe_document`].
pub fn subscribe_document_with_config(
    store: &Store,
    source: &str,
    config: &LiveDataConfig,
) -> Result<LiveSubscription, ExError> {
    let executor = SelectionExecutor::from_source(source)?;
    if executor.document().operation != OperationKind::Subscription {
        return Err(ExError::new(ExErrorKind::InvalidDocument)
            .with_op("subscribe_document")
            .with_message("expected a subscription operation"));
    }
    Ok(LiveSubscription::from_parts(
        store,
        Arc::new(executor),
        config.detector.detector(),
    ))
}

/// Execute a document once against the current snapshot
///
/// Accepts both `query` and `subscription` operations.
///
/// # Errors
///
/// Document-level errors, as for [`subscribe_document`].
pub fn execute_document(store: &Store, source: &str) -> Result<ExecutionResult, ExError> {
    let executor = SelectionExecutor::from_source(source)?;
    execute_once(store, &executor)
}
