use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::entity_list::Entity;
use super::house::House;

/// Jedi - a keyed record with two independent relations to houses
///
/// `house_ids` is a by-id relation that may reference houses which no longer
/// exist. `primary_address` embeds a House value and is set independently of
/// `house_ids`; `None` means no primary residence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Jedi {
    pub id: String,

    /// Ordered house ids; order is observable
    #[serde(rename = "houseIDs", default)]
    pub house_ids: Vec<String>,

    /// Embedded house value, shared with the owning snapshot when possible
    #[serde(default)]
    pub primary_address: Option<Arc<House>>,
}

impl Jedi {
    /// Create a new Jedi with no houses and no primary address
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            house_ids: Vec::new(),
            primary_address: None,
        }
    }

    /// Copy with a different id
    pub fn with_id(&self, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..self.clone()
        }
    }

    /// Copy with a new house id list
    pub fn with_house_ids<I, S>(&self, house_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            house_ids: house_ids.into_iter().map(Into::into).collect(),
            ..self.clone()
        }
    }

    /// Copy with a new primary address (or none)
    pub fn with_primary_address(&self, primary_address: Option<Arc<House>>) -> Self {
        Self {
            primary_address,
            ..self.clone()
        }
    }

    /// Id of the embedded primary address, if any
    pub fn primary_address_id(&self) -> Option<&str> {
        self.primary_address.as_deref().map(|h| h.id.as_str())
    }
}

impl Entity for Jedi {
    const COLLECTION: &'static str = "jedis";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_primary_address_shares_house() {
        let house = Arc::new(House::new("h1", "1 Main St.", "10001"));
        let jedi = Jedi::new("j1").with_primary_address(Some(house.clone()));
        let embedded = jedi.primary_address.as_ref().unwrap();
        assert!(Arc::ptr_eq(embedded, &house));
        assert_eq!(jedi.primary_address_id(), Some("h1"));
    }

    #[test]
    fn test_primary_address_is_independent_of_house_ids() {
        let house = Arc::new(House::new("h9", "9 Side St.", "10009"));
        let jedi = Jedi::new("j1")
            .with_house_ids(["h1", "h2"])
            .with_primary_address(Some(house));
        assert_eq!(jedi.house_ids, vec!["h1", "h2"]);
        assert_eq!(jedi.primary_address_id(), Some("h9"));
    }

    #[test]
    fn test_deserializes_house_ids_key() {
        let jedi: Jedi =
            serde_json::from_str(r#"{"id":"j1","houseIDs":["h1"],"primaryAddress":null}"#)
                .unwrap();
        assert_eq!(jedi.house_ids, vec!["h1"]);
        assert!(jedi.primary_address.is_none());
    }
}
