//! Live Feed Demonstration
//!
//! Opens a live subscription on a `Store` and replays a few transitions.
//!
//! Key concepts illustrated:
//! 1. Unconditional initial delivery
//! 2. Burst coalescing (two replaces, one result)
//! 3. Relation nulling on `primaryAddress`
//! 4. Silent no-op transitions

use futures::executor::block_on;
use livedata_core::logging_facility::{init, Profile};
use livedata_core::{EntityList, House, Jedi, Snapshot, Store};
use livedata_engine::subscribe_document;

const DOCUMENT: &str = r#"
subscription Feed {
  houses { id numberOfCats numberOfDogs }
  jedis { id primaryAddress { id address } }
}
"#;

fn seed() -> Snapshot {
    let houses: EntityList<House> = vec![
        House::new("house_1", "1 Main St.", "10001").with_pets(2, 1),
        House::new("house_2", "2 Main St.", "10002").with_pets(0, 3),
    ]
    .into();
    let primary = houses.get(0).cloned();
    let jedis: EntityList<Jedi> = vec![
        Jedi::new("jedi_1")
            .with_house_ids(["house_1"])
            .with_primary_address(primary),
        Jedi::new("jedi_2").with_house_ids(["house_2"]),
    ]
    .into();
    Snapshot::new(houses, jedis)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init(Profile::Development);
    println!("=== livedata Live Feed Demo ===\n");

    let store = Store::new(seed());
    let mut live = subscribe_document(&store, DOCUMENT)?;

    // ===== Part 1: Initial result =====
    let Some(first) = block_on(live.next()) else {
        return Ok(());
    };
    println!("## Initial\n{}\n", first?.to_json()?);

    // ===== Part 2: Burst =====
    store.update(|s| s.update_houses(|h| h.update(0, |house| house.with_pets(200, 0))));
    store.update(|s| s.update_houses(|h| h.push(House::new("add_that_id", "somwhere", "10210"))));
    if let Some(item) = block_on(live.next()) {
        println!("## After burst\n{}", item?.to_json()?);
    }
    println!("coalesced overwrites: {}\n", live.stats().coalesced_overwrites);

    // ===== Part 3: Relation nulling =====
    store.update(|s| s.update_jedis(|j| j.update(0, |jedi| jedi.with_primary_address(None))));
    if let Some(item) = block_on(live.next()) {
        println!("## After nulling primaryAddress\n{}\n", item?.to_json()?);
    }

    // ===== Part 4: No-op =====
    store.replace(store.current());
    let stats = live.stats();
    println!(
        "no-op transitions: {}, deliveries: {}",
        stats.no_op_transitions, stats.deliveries
    );

    live.close();
    Ok(())
}
