pub mod entity_list;
pub mod house;
pub mod jedi;
pub mod snapshot;

pub use entity_list::{Entity, EntityList};
pub use house::House;
pub use jedi::Jedi;
pub use snapshot::Snapshot;
