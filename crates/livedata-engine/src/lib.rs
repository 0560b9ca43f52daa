//! livedata Engine - live subscription sessions
//!
//! Bridges the push-based store notifications of `livedata-core` to a
//! pull-based asynchronous sequence of query results:
//! - [`subscribe`] / [`subscribe_document`] open a [`LiveSubscription`]
//! - each subscription is a `futures::Stream` of execution results
//! - a single-slot [`CoalescingBuffer`] decouples producer and consumer cadence
//!
//! ```
//! use futures::executor::block_on;
//! use livedata_core::{House, Store};
//! use livedata_engine::subscribe_document;
//!
//! let store = Store::default();
//! let mut live = subscribe_document(&store, "subscription { houses { id } }").unwrap();
//!
//! let first = block_on(live.next()).unwrap().unwrap();
//! assert_eq!(first.data.unwrap()["houses"].as_array().unwrap().len(), 0);
//!
//! store.update(|s| s.update_houses(|h| h.push(House::new("h1", "1 Main St.", "10001"))));
//! let update = block_on(live.next()).unwrap().unwrap();
//! assert_eq!(update.data.unwrap()["houses"][0]["id"], "h1");
//! ```

pub mod session;
pub mod subscribe;

pub use session::{CoalescingBuffer, LiveSubscription, SessionHandle, SessionState, SessionStats};
pub use subscribe::{execute_document, subscribe, subscribe_document, subscribe_document_with_config};
