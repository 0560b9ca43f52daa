//! The live-data store.
//!
//! Holds exactly one current [`Snapshot`] and fans every replacement out to
//! change listeners. Reads are lock-free (`arc-swap`); replacements are
//! serialized so that every listener observes snapshots in replace order.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::{Mutex, ReentrantMutex};

use crate::model::Snapshot;
use crate::{log_op_end, log_op_start};

type Handler = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Notifications queued by nested `replace` calls from inside a handler
#[derive(Default)]
struct Delivery {
    draining: bool,
    queue: VecDeque<Snapshot>,
}

struct StoreInner {
    current: ArcSwap<Snapshot>,
    listeners: Mutex<Vec<(u64, Handler)>>,
    next_listener_id: AtomicU64,
    replace_gate: ReentrantMutex<RefCell<Delivery>>,
}

/// Shared handle to the store; clones refer to the same state
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.inner.current.load();
        f.debug_struct("Store")
            .field("houses_len", &current.houses().len())
            .field("jedis_len", &current.jedis().len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(Snapshot::empty())
    }
}

impl Store {
    /// Create a store holding `initial`
    pub fn new(initial: Snapshot) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                current: ArcSwap::from_pointee(initial),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(1),
                replace_gate: ReentrantMutex::new(RefCell::new(Delivery::default())),
            }),
        }
    }

    /// The current snapshot
    pub fn current(&self) -> Snapshot {
        self.inner.current.load().as_ref().clone()
    }

    /// Install `next` and notify every listener
    ///
    /// Listeners are notified even when `next` equals the current snapshot.
    /// A `replace` issued from inside a handler is installed immediately but
    /// its notifications are queued behind the one in progress.
    pub fn replace(&self, next: Snapshot) {
        let gate = self.inner.replace_gate.lock();

        log_op_start!(
            "store_replace",
            houses_len = next.houses().len(),
            jedis_len = next.jedis().len()
        );
        let start = std::time::Instant::now();

        self.inner.current.store(Arc::new(next.clone()));

        let nested = {
            let mut delivery = gate.borrow_mut();
            delivery.queue.push_back(next);
            std::mem::replace(&mut delivery.draining, true)
        };

        let mut notified = 0usize;
        if !nested {
            let _reset = DrainReset(&gate);
            loop {
                let Some(snapshot) = gate.borrow_mut().queue.pop_front() else {
                    break;
                };
                let handlers = self.handlers();
                notified += handlers.len();
                for handler in &handlers {
                    handler(&snapshot);
                }
            }
        }

        let elapsed = start.elapsed().as_millis() as u64;
        log_op_end!(
            "store_replace",
            duration_ms = elapsed,
            listeners = notified,
            nested = nested
        );
    }

    /// Derive the next snapshot from the current one and install it
    ///
    /// Read and install happen under the replace gate, so concurrent updaters
    /// never lose each other's edits.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&Snapshot) -> Snapshot,
    {
        let _gate = self.inner.replace_gate.lock();
        let next = f(&self.current());
        self.replace(next);
    }

    /// Register a handler called with every replaced snapshot
    ///
    /// The listener stays registered until the returned handle is dropped or
    /// [`ListenerHandle::unsubscribe`] is called.
    pub fn subscribe_to_changes<F>(&self, handler: F) -> ListenerHandle
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, Arc::new(handler)));
        tracing::debug!(listener_id = id, "listener subscribed");
        ListenerHandle {
            store: Arc::downgrade(&self.inner),
            id,
            active: true,
        }
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    fn handlers(&self) -> Vec<Handler> {
        self.inner
            .listeners
            .lock()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect()
    }
}

struct DrainReset<'a>(&'a RefCell<Delivery>);

impl Drop for DrainReset<'_> {
    fn drop(&mut self) {
        let mut delivery = self.0.borrow_mut();
        delivery.draining = false;
        delivery.queue.clear();
    }
}

fn detach(inner: &StoreInner, id: u64) -> bool {
    let mut listeners = inner.listeners.lock();
    let before = listeners.len();
    listeners.retain(|(lid, _)| *lid != id);
    before != listeners.len()
}

/// Registration of one change listener
#[must_use = "dropping the handle unsubscribes the listener"]
pub struct ListenerHandle {
    store: Weak<StoreInner>,
    id: u64,
    active: bool,
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

impl ListenerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Detach the listener. Returns false if it was already gone.
    ///
    /// A notification already in flight on another thread may still reach
    /// the handler once.
    pub fn unsubscribe(mut self) -> bool {
        self.detach()
    }

    fn detach(&mut self) -> bool {
        if !std::mem::replace(&mut self.active, false) {
            return false;
        }
        let removed = self
            .store
            .upgrade()
            .is_some_and(|inner| detach(&inner, self.id));
        if removed {
            tracing::debug!(listener_id = self.id, "listener unsubscribed");
        }
        removed
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.detach();
    }
}
