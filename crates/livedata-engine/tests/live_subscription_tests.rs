//! End-to-end behaviour of live subscriptions over the shared fixture.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::thread;

use futures::stream::{FusedStream, StreamExt};
use livedata_core::errors::{ExError, ExErrorKind};
use livedata_core::query::{ExecutionResult, SelectionExecutor};
use livedata_core::{House, Jedi, LiveDataConfig, Snapshot, Store};
use livedata_engine::{execute_document, subscribe, subscribe_document, LiveSubscription, SessionState};
use serde_json::{json, Value};
use tokio_test::{assert_pending, assert_ready};

use common::{assert_no_item, empty_state, initial_state, new_store, INTEGRATION_QUERY};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn live(store: &Store) -> LiveSubscription {
    subscribe_document(store, INTEGRATION_QUERY).unwrap()
}

async fn pull_data(live: &mut LiveSubscription) -> Value {
    let result = live.next().await.expect("session closed").expect("fatal error");
    assert!(result.errors.is_empty(), "unexpected field errors: {:?}", result.errors);
    result.data.expect("no data")
}

fn apply(store: &Store, f: impl FnOnce(&Snapshot) -> Snapshot) {
    store.update(f);
}

// ---------------------------------------------------------------------------
// Initial delivery
// ---------------------------------------------------------------------------

// L1: The initial query is published on the first pull
#[tokio::test]
async fn test_publishes_initial_query_immediately() {
    let store = new_store();
    let mut live = live(&store);
    assert_eq!(live.state(), SessionState::Init);
    assert_eq!(store.listener_count(), 0, "nothing subscribes before the first pull");

    let data = pull_data(&mut live).await;
    assert_eq!(data["houses"][0]["id"], json!("house_1"));
    assert_eq!(data["jedis"][0]["houses"][1]["address"], json!("2 Main St."));
    assert_eq!(live.state(), SessionState::Active);
    assert_eq!(store.listener_count(), 1);
    assert_eq!(live.stats().deliveries, 1);
}

// L2: Empty collections still produce an initial result
#[tokio::test]
async fn test_empty_state_initial_delivery_is_unconditional() {
    let store = Store::new(empty_state());
    let mut live = live(&store);

    let data = pull_data(&mut live).await;
    assert_eq!(data["houses"], json!([]));
    assert_eq!(data["jedis"][0]["houses"], json!([]));
}

// L3: Jedi id change on the empty state publishes one update
#[tokio::test]
async fn test_empty_state_publishes_jedi_id_change() {
    let store = Store::new(empty_state());
    let mut live = live(&store);
    pull_data(&mut live).await;

    apply(&store, |s| s.update_jedis(|j| j.update(0, |jedi| jedi.with_id("a_different_id"))));

    let data = pull_data(&mut live).await;
    assert_eq!(data["jedis"][0]["id"], json!("a_different_id"));
    assert_eq!(data["jedis"][1]["id"], json!("jedi_2"));
    assert_no_item(&mut live);
}

// ---------------------------------------------------------------------------
// Suppression
// ---------------------------------------------------------------------------

// L4: Replacing with the same snapshot twice never delivers
#[tokio::test]
async fn test_identical_replace_is_idempotent_no_op() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;

    let same = store.current();
    store.replace(same.clone());
    store.replace(same);

    assert_no_item(&mut live);
    let stats = live.stats();
    assert_eq!(stats.notifications, 2);
    assert_eq!(stats.no_op_transitions, 2);
    assert_eq!(stats.deliveries, 1);
}

// L5: A rebuilt, value-equal snapshot is a no-op
#[tokio::test]
async fn test_value_equal_snapshot_is_no_op() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;

    store.replace(initial_state());

    assert_no_item(&mut live);
    assert_eq!(live.stats().no_op_transitions, 1);
}

// L6: A change the document does not select is re-executed but not delivered
#[tokio::test]
async fn test_unselected_change_updates_baseline_only() {
    let store = new_store();
    let mut live = subscribe_document(&store, "subscription { houses { id } }").unwrap();
    pull_data(&mut live).await;

    apply(&store, |s| s.update_houses(|h| h.update(0, |house| house.with_pets(200, 0))));
    assert_no_item(&mut live);
    assert_eq!(live.stats().same_result_suppressions, 1);

    // The baseline moved: replaying the current snapshot is now a cheap no-op
    store.replace(store.current());
    assert_eq!(live.stats().no_op_transitions, 1);
    assert_eq!(live.stats().same_result_suppressions, 1);
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

// L7: Pet counts on one house
#[tokio::test]
async fn test_publishes_field_mutation() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;

    apply(&store, |s| s.update_houses(|h| h.update(0, |house| house.with_pets(200, 0))));

    let data = pull_data(&mut live).await;
    assert_eq!(data["houses"][0]["numberOfCats"], json!(200));
    assert_eq!(data["houses"][0]["numberOfDogs"], json!(0));
    assert_eq!(data["houses"][1]["numberOfDogs"], json!(3));
    assert_no_item(&mut live);

    // Second patch: both addresses in one transition
    apply(&store, |s| {
        s.update_houses(|h| {
            h.update(0, |house| house.with_address(format!("{} apt. 1", house.address)))
                .update(1, |house| house.with_address(format!("{} apt. 2", house.address)))
        })
    });
    let data = pull_data(&mut live).await;
    assert_eq!(data["houses"][0]["address"], json!("1 Main St. apt. 1"));
    assert_eq!(data["houses"][1]["address"], json!("2 Main St. apt. 2"));
    assert_eq!(data["jedis"][1]["houses"][0]["address"], json!("2 Main St. apt. 2"));
    assert_eq!(live.stats().deliveries, 3);
}

// L8: A pushed house appears once, in append position
#[tokio::test]
async fn test_publishes_new_list_entries() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;

    let added = House::new("add_that_id", "somwhere", "10210").with_pets(10, 5);
    apply(&store, |s| s.update_houses(|h| h.push(added)));

    let data = pull_data(&mut live).await;
    let houses = data["houses"].as_array().unwrap();
    assert_eq!(houses.len(), 3);
    assert_eq!(
        houses[2],
        json!({
            "id": "add_that_id",
            "address": "somwhere",
            "postalCode": "10210",
            "numberOfCats": 10,
            "numberOfDogs": 5
        })
    );
    assert_no_item(&mut live);
}

// L9: Slicing off the first jedi
#[tokio::test]
async fn test_publishes_removed_list_entries() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;

    apply(&store, |s| s.update_jedis(|j| j.slice_from(1)));

    let data = pull_data(&mut live).await;
    let jedis = data["jedis"].as_array().unwrap();
    assert_eq!(jedis.len(), 1);
    assert_eq!(jedis[0]["id"], json!("jedi_2"));
}

// L10: Setting a primary address publishes the new child object
#[tokio::test]
async fn test_publishes_new_child_objects() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;

    let house = store.current().houses().get(0).cloned();
    apply(&store, |s| s.update_jedis(|j| j.update(0, |jedi| jedi.with_primary_address(house))));

    let data = pull_data(&mut live).await;
    assert_eq!(
        data["jedis"][0]["primaryAddress"],
        json!({"id": "house_1", "address": "1 Main St."})
    );
    assert_eq!(data["jedis"][1]["primaryAddress"], Value::Null);
}

// L11: Nulling a primary address publishes null
#[tokio::test]
async fn test_publishes_removed_child_objects() {
    let state = initial_state();
    let house = state.houses().get(0).cloned();
    let store = Store::new(state.update_jedis(|j| j.update(0, |jedi| jedi.with_primary_address(house))));
    let mut live = live(&store);
    let data = pull_data(&mut live).await;
    assert_eq!(data["jedis"][0]["primaryAddress"]["id"], json!("house_1"));

    apply(&store, |s| s.update_jedis(|j| j.update(0, |jedi| jedi.with_primary_address(None))));

    let data = pull_data(&mut live).await;
    assert_eq!(data["jedis"][0]["primaryAddress"], Value::Null);
}

// L12: Editing the house a primary address points at re-renders it
#[tokio::test]
async fn test_primary_address_tracks_referenced_house() {
    let state = initial_state();
    let house = state.houses().get(1).cloned();
    let store = Store::new(state.update_jedis(|j| j.update(1, |jedi| jedi.with_primary_address(house))));
    let mut live = subscribe_document(&store, "subscription { jedis { primaryAddress { address } } }").unwrap();
    pull_data(&mut live).await;

    apply(&store, |s| s.update_houses(|h| h.update(1, |house| house.with_address("moved"))));

    let data = pull_data(&mut live).await;
    assert_eq!(data["jedis"][1]["primaryAddress"]["address"], json!("moved"));
}

// ---------------------------------------------------------------------------
// Coalescing
// ---------------------------------------------------------------------------

// L13: Two replaces before a pull yield one result with the net state
#[tokio::test]
async fn test_burst_is_coalesced() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;

    apply(&store, |s| s.update_houses(|h| h.update(0, |house| house.with_pets(200, 0))));
    apply(&store, |s| s.update_houses(|h| h.push(House::new("add_that_id", "somwhere", "10210"))));

    let data = pull_data(&mut live).await;
    assert_eq!(data["houses"][0]["numberOfCats"], json!(200));
    assert_eq!(data["houses"][2]["id"], json!("add_that_id"));
    assert_no_item(&mut live);

    let stats = live.stats();
    assert_eq!(stats.coalesced_overwrites, 1);
    assert_eq!(stats.deliveries, 2);
}

// L14: A burst that returns to the delivered state yields nothing
#[tokio::test]
async fn test_burst_reverting_to_delivered_result_is_dropped() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;

    let original = store.current();
    apply(&store, |s| s.update_houses(|h| h.update(0, |house| house.with_pets(200, 0))));
    store.replace(original);

    assert_no_item(&mut live);
    assert_eq!(live.stats().same_result_suppressions, 1);
}

// L15: A waiting pull is woken by a replace
#[tokio::test]
async fn test_pending_pull_is_woken_by_update() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;

    {
        let mut pull = tokio_test::task::spawn(live.next());
        assert_pending!(pull.poll());

        apply(&store, |s| s.update_jedis(|j| j.slice_from(1)));

        assert!(pull.is_woken());
        let item = assert_ready!(pull.poll()).unwrap().unwrap();
        assert_eq!(item.data.unwrap()["jedis"].as_array().unwrap().len(), 1);
    }
}

// L16: Updates from another thread reach an awaiting consumer
#[tokio::test]
async fn test_update_from_another_thread() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;

    let producer = {
        let store = store.clone();
        thread::spawn(move || {
            store.update(|s| s.update_houses(|h| h.update(1, |house| house.with_pets(7, 7))));
        })
    };

    let data = pull_data(&mut live).await;
    producer.join().unwrap();
    assert_eq!(data["houses"][1]["numberOfCats"], json!(7));
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

// L17: Pulls after close yield the terminal signal, never an error
#[tokio::test]
async fn test_close_then_terminal() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;

    apply(&store, |s| s.update_houses(|h| h.update(0, |house| house.with_pets(1, 1))));
    live.close();

    assert!(live.next().await.is_none(), "buffered result is released on close");
    assert!(live.next().await.is_none());
    assert_eq!(live.state(), SessionState::Closed);
    assert!(live.is_terminated());
    assert_eq!(store.listener_count(), 0);
}

// L18: Closing before the first pull never subscribes
#[tokio::test]
async fn test_close_before_first_pull() {
    let store = new_store();
    let mut live = live(&store);
    live.close();
    assert!(live.next().await.is_none());
    assert_eq!(store.listener_count(), 0);
}

// L19: Closing through a handle wakes a waiting pull
#[tokio::test]
async fn test_handle_close_wakes_pending_pull() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;
    let handle = live.handle();

    let mut pull = tokio_test::task::spawn(live.next());
    assert_pending!(pull.poll());

    handle.close();

    assert!(pull.is_woken());
    assert!(assert_ready!(pull.poll()).is_none());
    assert_eq!(handle.state(), SessionState::Closed);
}

// L20: Dropping the subscription detaches it from the store
#[tokio::test]
async fn test_drop_unsubscribes() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;
    let handle = live.handle();
    assert_eq!(store.listener_count(), 1);

    drop(live);

    assert_eq!(store.listener_count(), 0);
    assert_eq!(handle.state(), SessionState::Closed);
    store.replace(Snapshot::empty());
    assert_eq!(handle.stats().notifications, 0);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

// L21: Field-level errors are delivered and the session stays open
#[tokio::test]
async fn test_field_errors_do_not_close_the_session() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;

    apply(&store, |s| s.update_houses(|h| h.remove_by_id("house_2")));

    let result = live.next().await.unwrap().unwrap();
    assert_eq!(result.errors.len(), 2);
    assert_eq!(result.data.unwrap()["jedis"][1]["houses"], json!([null]));
    assert_eq!(live.state(), SessionState::Active);

    apply(&store, |s| s.update_houses(|h| h.push(House::new("house_2", "back", "10002"))));
    let data = pull_data(&mut live).await;
    assert_eq!(data["jedis"][1]["houses"][0]["address"], json!("back"));
}

// L22: A fatal execution error is delivered once and closes the session
#[tokio::test]
async fn test_fatal_error_closes_session() {
    let store = new_store();
    let executor = |s: &Snapshot| -> Result<ExecutionResult, ExError> {
        if s.houses().len() > 2 {
            return Err(ExError::new(ExErrorKind::ExecutionFailed).with_message("too many houses"));
        }
        Ok(ExecutionResult::from_data(json!(s.houses().len())))
    };
    let mut live = subscribe(&store, executor);
    assert_eq!(live.next().await.unwrap().unwrap().data, Some(json!(2)));

    apply(&store, |s| s.update_houses(|h| h.push(House::new("h3", "x", "0"))));
    // Later notifications cannot displace the pending error
    apply(&store, |s| s.update_houses(|h| h.slice_from(2)));

    let err = live.next().await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ExecutionFailed);
    assert_eq!(err.session_id(), Some(live.session_id()));
    assert_eq!(err.op(), Some("session_notify"));

    assert!(live.next().await.is_none());
    assert_eq!(store.listener_count(), 0);
}

// L23: A fatal error on the first pull closes before any result
#[tokio::test]
async fn test_fatal_error_on_initial_execution() {
    let store = new_store();
    let mut live = subscribe(&store, |_: &Snapshot| -> Result<ExecutionResult, ExError> {
        Err(ExError::new(ExErrorKind::ExecutionFailed).with_message("down"))
    });

    let err = live.next().await.unwrap().unwrap_err();
    assert_eq!(err.op(), Some("session_init"));
    assert!(live.next().await.is_none());
    assert_eq!(store.listener_count(), 0);
}

// L24: Duplicate ids fail fast as a delivered error
#[tokio::test]
async fn test_duplicate_ids_are_a_delivered_error() {
    let store = new_store();
    let mut live = live(&store);
    pull_data(&mut live).await;

    apply(&store, |s| s.update_jedis(|j| j.push(Jedi::new("jedi_1"))));

    let err = live.next().await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::DuplicateEntityId);
    assert_eq!(err.entity_id(), Some("jedi_1"));
    assert!(live.next().await.is_none());
}

// L25: Validation can be switched off through configuration
#[tokio::test]
async fn test_duplicate_ids_tolerated_when_validation_disabled() {
    let config = LiveDataConfig::from_toml_str("[detector]\nvalidate_snapshots = false\n").unwrap();
    let store = new_store();
    let executor = SelectionExecutor::from_source(INTEGRATION_QUERY).unwrap();
    let mut live = LiveSubscription::with_config(&store, executor, &config);
    pull_data(&mut live).await;

    apply(&store, |s| s.update_jedis(|j| j.push(Jedi::new("jedi_1"))));

    let data = pull_data(&mut live).await;
    assert_eq!(data["jedis"].as_array().unwrap().len(), 3);
}

// L26: Document errors surface before any item
#[test]
fn test_document_errors_are_returned_up_front() {
    let store = new_store();

    let err = subscribe_document(&store, "subscription { jedis { lightsaber } }").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::UnknownField);

    let err = subscribe_document(&store, "query { houses { id } }").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidDocument);

    let err = subscribe_document(&store, "subscription { houses { id id: address } }").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidDocument);

    assert_eq!(store.listener_count(), 0);
}

// ---------------------------------------------------------------------------
// Misc
// ---------------------------------------------------------------------------

// L27: Independent subscribers keep independent baselines
#[tokio::test]
async fn test_subscribers_are_independent() {
    let store = new_store();
    let mut early = live(&store);
    pull_data(&mut early).await;

    apply(&store, |s| s.update_houses(|h| h.update(0, |house| house.with_pets(200, 0))));

    let mut late = live(&store);
    let late_first = pull_data(&mut late).await;
    let early_update = pull_data(&mut early).await;
    assert_eq!(late_first, early_update);
    assert_no_item(&mut late);
    assert_eq!(store.listener_count(), 2);
}

// L28: The subscription is a futures Stream
#[tokio::test]
async fn test_stream_combinators() {
    let store = new_store();
    let live = live(&store);
    let handle = live.handle();

    let first: Vec<_> = live.take(1).collect().await;
    assert_eq!(first.len(), 1);
    assert!(first[0].is_ok());
    // `take` dropped the subscription
    assert_eq!(handle.state(), SessionState::Closed);
}

// L29: One-shot execution of a document
#[test]
fn test_execute_document_once() {
    let store = new_store();
    let result = execute_document(&store, "{ jedis { id } }").unwrap();
    assert_eq!(result.data, Some(json!({"jedis": [{"id": "jedi_1"}, {"id": "jedi_2"}]})));
    assert_eq!(store.listener_count(), 0);
}

// L30: Executors can be shared between sessions
#[tokio::test]
async fn test_shared_executor() {
    let store = new_store();
    let executor = Arc::new(SelectionExecutor::from_source("subscription { houses { id } }").unwrap());
    let a = Arc::clone(&executor);
    let b = Arc::clone(&executor);
    let mut first = subscribe(&store, move |s: &Snapshot| livedata_core::QueryExecutor::execute(&*a, s));
    let mut second = subscribe(&store, move |s: &Snapshot| livedata_core::QueryExecutor::execute(&*b, s));

    assert_eq!(pull_data(&mut first).await, pull_data(&mut second).await);
    assert_ne!(first.session_id(), second.session_id());
}
