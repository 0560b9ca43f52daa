use serde::{Deserialize, Serialize};

use super::entity_list::Entity;

/// House - a keyed residence record
///
/// Field names serialize in the camelCase form the query schema exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct House {
    /// Stable identity, preserved by every copy-on-write edit
    pub id: String,

    pub address: String,

    pub postal_code: String,

    pub number_of_cats: u32,

    pub number_of_dogs: u32,
}

impl House {
    /// Create a new House with no pets
    pub fn new(id: impl Into<String>, address: impl Into<String>, postal_code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            postal_code: postal_code.into(),
            number_of_cats: 0,
            number_of_dogs: 0,
        }
    }

    /// Copy with a new address
    pub fn with_address(&self, address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..self.clone()
        }
    }

    /// Copy with new pet counts
    pub fn with_pets(&self, number_of_cats: u32, number_of_dogs: u32) -> Self {
        Self {
            number_of_cats,
            number_of_dogs,
            ..self.clone()
        }
    }
}

impl Entity for House {
    const COLLECTION: &'static str = "houses";

    fn id(&self) -> &str {
        &self.id
    }
}
