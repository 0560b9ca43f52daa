//! Live subscription sessions.
//!
//! A [`LiveSubscription`] turns store notifications (push) into a pull-based
//! asynchronous sequence of execution results. The first pull captures the
//! current snapshot and delivers its result unconditionally. Afterwards each
//! notification is checked by the change detector, re-executed only when
//! observable, compared with the last delivered result and, if different,
//! parked in a single-slot buffer until the consumer pulls.

mod buffer;
mod shared;
mod stats;

pub use buffer::CoalescingBuffer;
pub use stats::SessionStats;

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{FusedStream, Stream};
use livedata_core::diff::ChangeDetector;
use livedata_core::errors::ExError;
use livedata_core::query::{ExecutionResult, QueryExecutor};
use livedata_core::{LiveDataConfig, Store};
use livedata_core_types::schema::REASON_CLOSED;
use livedata_core_types::{SessionId, TraceId};

use shared::Shared;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing pulled yet
    Init,
    /// Initial result delivered, following the store
    Active,
    /// Terminal; every pull yields `None`
    Closed,
}

/// Pull-based live query over a [`Store`]
///
/// Implements [`Stream`]; `None` is the terminal signal. Items are `Err` only
/// for fatal, document-level failures, after which the session is closed.
/// Dropping the subscription closes it.
#[must_use = "a subscription does nothing until it is polled"]
pub struct LiveSubscription {
    shared: Arc<Shared>,
}

impl LiveSubscription {
    /// Create a session with the default detector settings
    pub fn new<E>(store: &Store, executor: E) -> Self
    where
        E: QueryExecutor + 'static,
    {
        Self::from_parts(store, Arc::new(executor), ChangeDetector::default())
    }

    /// Create a session honouring `config`
    pub fn with_config<E>(store: &Store, executor: E, config: &LiveDataConfig) -> Self
    where
        E: QueryExecutor + 'static,
    {
        Self::from_parts(store, Arc::new(executor), config.detector.detector())
    }

    pub(crate) fn from_parts(
        store: &Store,
        executor: Arc<dyn QueryExecutor>,
        detector: ChangeDetector,
    ) -> Self {
        let shared = Shared::new(store.clone(), executor, detector);
        tracing::debug!(session_id = shared.id.as_str(), "session created");
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Attach a trace id to every error this session delivers
    ///
    /// Ignored once the session has been polled or a [`SessionHandle`]
    /// exists.
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.trace_id = Some(trace_id);
        }
        self
    }

    /// Pull the next item; `None` once the session is closed
    pub async fn next(&mut self) -> Option<Result<ExecutionResult, ExError>> {
        let shared = Arc::clone(&self.shared);
        futures::future::poll_fn(move |cx| shared.poll_item(cx)).await
    }

    /// Cancel the session; later pulls yield `None`
    pub fn close(&self) {
        self.shared.close(REASON_CLOSED);
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state
    }

    pub fn session_id(&self) -> &SessionId {
        &self.shared.id
    }

    pub fn stats(&self) -> SessionStats {
        self.shared.inner.lock().stats
    }

    /// Handle for closing or observing the session from elsewhere
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl fmt::Debug for LiveSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSubscription")
            .field("session_id", &self.shared.id)
            .field("state", &self.state())
            .finish()
    }
}

impl Stream for LiveSubscription {
    type Item = Result<ExecutionResult, ExError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.shared.poll_item(cx)
    }
}

impl FusedStream for LiveSubscription {
    fn is_terminated(&self) -> bool {
        self.state() == SessionState::Closed
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.shared.close(REASON_CLOSED);
    }
}

/// Cloneable handle to a session
///
/// Closing through the handle wakes a pull that is waiting for an update.
/// Holding a handle does not keep the session open once the
/// [`LiveSubscription`] is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    pub fn close(&self) {
        self.shared.close(REASON_CLOSED);
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state
    }

    pub fn session_id(&self) -> &SessionId {
        &self.shared.id
    }

    pub fn stats(&self) -> SessionStats {
        self.shared.inner.lock().stats
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.shared.id)
            .finish()
    }
}
