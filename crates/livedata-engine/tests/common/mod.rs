use livedata_core::{EntityList, House, Jedi, Snapshot, Store};
use livedata_engine::LiveSubscription;

/// Subscription document exercising every field of the schema
#[allow(dead_code)]
pub const INTEGRATION_QUERY: &str = r#"
subscription IntegrationTest {
  houses {
    id
    address
    postalCode
    numberOfCats
    numberOfDogs
  }
  jedis {
    id
    houseIDs
    houses { id address }
    primaryAddress { id address }
  }
}
"#;

/// Two houses, two jedis, no primary addresses
#[allow(dead_code)]
pub fn initial_state() -> Snapshot {
    let houses: EntityList<House> = vec![
        House::new("house_1", "1 Main St.", "10001").with_pets(2, 1),
        House::new("house_2", "2 Main St.", "10002").with_pets(0, 3),
    ]
    .into();
    let jedis: EntityList<Jedi> = vec![
        Jedi::new("jedi_1").with_house_ids(["house_1", "house_2"]),
        Jedi::new("jedi_2").with_house_ids(["house_2"]),
    ]
    .into();
    Snapshot::new(houses, jedis)
}

/// Initial state with no houses and every relation cleared
#[allow(dead_code)]
pub fn empty_state() -> Snapshot {
    initial_state()
        .with_houses(EntityList::new())
        .update_jedis(|jedis| jedis.map(|jedi| jedi.with_house_ids(Vec::<String>::new())))
}

/// Store seeded with [`initial_state`]
#[allow(dead_code)]
pub fn new_store() -> Store {
    Store::new(initial_state())
}

/// Assert that the next pull would wait
#[allow(dead_code)]
pub fn assert_no_item(live: &mut LiveSubscription) {
    let mut pull = tokio_test::task::spawn(live.next());
    tokio_test::assert_pending!(pull.poll());
}
