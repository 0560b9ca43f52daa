//! Session state shared between the consumer and the store listener.
//!
//! Lock order: the store's replace gate, then `Shared::inner`. Nothing here
//! calls into the store while holding `inner`, except `Store::current`, which
//! is lock-free.

#![allow(clippy::result_large_err)]

use std::sync::{Arc, Weak};
use std::task::{Context, Poll, Waker};

use livedata_core::diff::{is_no_op, render_human_summary, ChangeDetector};
use livedata_core::errors::ExError;
use livedata_core::query::{execute_logged, ExecutionResult, QueryExecutor};
use livedata_core::store::ListenerHandle;
use livedata_core::{log_op_end, log_op_error, log_op_start, Snapshot, Store};
use livedata_core_types::schema::{REASON_COALESCED, REASON_FATAL, REASON_NO_OP, REASON_SAME_RESULT};
use livedata_core_types::{SessionId, TraceId};
use parking_lot::Mutex;

use super::buffer::CoalescingBuffer;
use super::stats::SessionStats;
use super::SessionState;

pub(crate) type Item = Result<ExecutionResult, ExError>;

pub(crate) struct Inner {
    pub(crate) state: SessionState,
    /// Snapshot the last computed result was rendered from
    baseline: Option<Snapshot>,
    /// Result the consumer last received
    delivered: Option<ExecutionResult>,
    buffer: CoalescingBuffer<Item>,
    /// A fatal error is waiting in the buffer; later notifications are ignored
    failed: bool,
    waker: Option<Waker>,
    listener: Option<ListenerHandle>,
    pub(crate) stats: SessionStats,
}

pub(crate) struct Shared {
    pub(crate) id: SessionId,
    pub(crate) trace_id: Option<TraceId>,
    store: Store,
    executor: Arc<dyn QueryExecutor>,
    detector: ChangeDetector,
    pub(crate) inner: Mutex<Inner>,
}

impl Shared {
    pub(crate) fn new(store: Store, executor: Arc<dyn QueryExecutor>, detector: ChangeDetector) -> Self {
        Self {
            id: SessionId::new(),
            trace_id: None,
            store,
            executor,
            detector,
            inner: Mutex::new(Inner {
                state: SessionState::Init,
                baseline: None,
                delivered: None,
                buffer: CoalescingBuffer::new(),
                failed: false,
                waker: None,
                listener: None,
                stats: SessionStats::default(),
            }),
        }
    }

    fn tag(&self, err: ExError) -> ExError {
        let err = err.with_session_id(self.id.clone());
        match &self.trace_id {
            Some(trace_id) => err.with_trace_id(trace_id.clone()),
            None => err,
        }
    }

    /// Consumer side of the protocol
    pub(crate) fn poll_item(self: &Arc<Self>, cx: &mut Context<'_>) -> Poll<Option<Item>> {
        let mut inner = self.inner.lock();
        match inner.state {
            SessionState::Closed => Poll::Ready(None),
            SessionState::Init => {
                drop(inner);
                Poll::Ready(self.initialize())
            }
            SessionState::Active => match inner.buffer.take() {
                Some(Ok(result)) => {
                    inner.delivered = Some(result.clone());
                    inner.stats.deliveries += 1;
                    Poll::Ready(Some(Ok(result)))
                }
                Some(Err(err)) => {
                    inner.stats.deliveries += 1;
                    drop(inner);
                    self.close(REASON_FATAL);
                    Poll::Ready(Some(Err(err)))
                }
                None => {
                    inner.waker = Some(cx.waker().clone());
                    Poll::Pending
                }
            },
        }
    }

    /// First pull: capture, execute and deliver unconditionally
    ///
    /// `None` when the session was closed after `poll_item` released the lock.
    fn initialize(self: &Arc<Self>) -> Option<Item> {
        log_op_start!("session_init", session_id = self.id.as_str());
        let start = std::time::Instant::now();

        // Subscribe before capturing so no replace can fall between the two
        let weak: Weak<Self> = Arc::downgrade(self);
        let listener = self.store.subscribe_to_changes(move |next| {
            if let Some(shared) = weak.upgrade() {
                shared.on_change(next);
            }
        });

        let mut inner = self.inner.lock();
        if inner.state != SessionState::Init {
            drop(inner);
            drop(listener);
            tracing::debug!(session_id = self.id.as_str(), "closed before first pull completed");
            return None;
        }
        let snapshot = self.store.current();
        let result = self
            .detector
            .check(&snapshot)
            .and_then(|()| execute_logged(self.executor.as_ref(), &snapshot));

        let elapsed = start.elapsed().as_millis() as u64;
        match result {
            Ok(result) => {
                inner.state = SessionState::Active;
                inner.baseline = Some(snapshot);
                inner.delivered = Some(result.clone());
                inner.listener = Some(listener);
                inner.stats.deliveries += 1;
                log_op_end!("session_init", duration_ms = elapsed, session_id = self.id.as_str());
                Some(Ok(result))
            }
            Err(err) => {
                inner.state = SessionState::Closed;
                drop(inner);
                drop(listener);
                let err = self.tag(err.with_op("session_init"));
                let e_clone = err.clone();
                log_op_error!("session_init", e_clone, duration_ms = elapsed, session_id = self.id.as_str());
                Some(Err(err))
            }
        }
    }

    /// Producer side: runs inside the store's notification fan-out
    fn on_change(&self, next: &Snapshot) {
        let mut inner = self.inner.lock();
        if inner.state != SessionState::Active || inner.failed {
            return;
        }
        inner.stats.notifications += 1;

        let Some(baseline) = inner.baseline.clone() else {
            return;
        };

        if is_no_op(&baseline, next) {
            inner.stats.no_op_transitions += 1;
            inner.baseline = Some(next.clone());
            tracing::debug!(
                session_id = self.id.as_str(),
                reason = REASON_NO_OP,
                "notification suppressed"
            );
            return;
        }

        log_op_start!("session_notify", session_id = self.id.as_str());
        let start = std::time::Instant::now();

        let outcome = self.detector.detect(&baseline, next).and_then(|diff| {
            if tracing::enabled!(tracing::Level::DEBUG) {
                tracing::debug!(
                    session_id = self.id.as_str(),
                    summary = %render_human_summary(&diff),
                    "snapshot transition"
                );
            }
            execute_logged(self.executor.as_ref(), next)
        });
        let elapsed = start.elapsed().as_millis() as u64;

        let waker = match outcome {
            Ok(candidate) => {
                inner.baseline = Some(next.clone());
                if inner.delivered.as_ref() == Some(&candidate) {
                    inner.stats.same_result_suppressions += 1;
                    // Anything buffered is now obsolete: the state went back
                    inner.buffer.clear();
                    tracing::debug!(
                        session_id = self.id.as_str(),
                        reason = REASON_SAME_RESULT,
                        "notification suppressed"
                    );
                    None
                } else {
                    if inner.buffer.put(Ok(candidate)) {
                        inner.stats.coalesced_overwrites += 1;
                        tracing::debug!(
                            session_id = self.id.as_str(),
                            reason = REASON_COALESCED,
                            "buffered result replaced"
                        );
                    }
                    inner.waker.take()
                }
            }
            Err(err) => {
                inner.failed = true;
                let err = self.tag(err.with_op("session_notify"));
                let e_clone = err.clone();
                log_op_error!("session_notify", e_clone, duration_ms = elapsed, session_id = self.id.as_str());
                inner.buffer.put(Err(err));
                inner.waker.take()
            }
        };
        if !inner.failed {
            log_op_end!("session_notify", duration_ms = elapsed, session_id = self.id.as_str());
        }
        drop(inner);

        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Detach from the store, drop buffered state and wake a pending pull
    pub(crate) fn close(&self, reason: &'static str) {
        let start = std::time::Instant::now();
        let (listener, waker) = {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Closed {
                return;
            }
            log_op_start!("session_close", session_id = self.id.as_str(), reason = reason);
            inner.state = SessionState::Closed;
            inner.buffer.clear();
            inner.baseline = None;
            inner.delivered = None;
            (inner.listener.take(), inner.waker.take())
        };
        // Unsubscribe outside the session lock
        let detached = listener.map(ListenerHandle::unsubscribe).unwrap_or(false);
        if let Some(waker) = waker {
            waker.wake();
        }
        let elapsed = start.elapsed().as_millis() as u64;
        log_op_end!(
            "session_close",
            duration_ms = elapsed,
            session_id = self.id.as_str(),
            detached = detached
        );
    }
}
