//! Immutable whole-state snapshots.
//!
//! A [`Snapshot`] is a cheap handle (`Arc`) over the observable state at one
//! instant. Transformations return a new handle and share every subtree they
//! did not touch with the snapshot they started from.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity_list::EntityList;
use super::house::House;
use super::jedi::Jedi;
use crate::errors::{LiveDataError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SnapshotData {
    #[serde(default)]
    houses: EntityList<House>,
    #[serde(default)]
    jedis: EntityList<Jedi>,
    /// Domain-specific top-level fields beyond the two collections
    #[serde(flatten)]
    extensions: Arc<BTreeMap<String, Value>>,
}

/// One immutable instant of the observable application state
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    data: Arc<SnapshotData>,
}

impl Snapshot {
    /// Create a snapshot from its two collections
    pub fn new(houses: EntityList<House>, jedis: EntityList<Jedi>) -> Self {
        Self::from_data(SnapshotData {
            houses,
            jedis,
            extensions: Arc::new(BTreeMap::new()),
        })
    }

    /// Snapshot with empty collections and no extensions
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_data(data: SnapshotData) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    pub fn houses(&self) -> &EntityList<House> {
        &self.data.houses
    }

    pub fn jedis(&self) -> &EntityList<Jedi> {
        &self.data.jedis
    }

    pub fn extensions(&self) -> &Arc<BTreeMap<String, Value>> {
        &self.data.extensions
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.data.extensions.get(key)
    }

    /// True when both handles point at the same state
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Copy with a different houses collection, sharing everything else
    pub fn with_houses(&self, houses: EntityList<House>) -> Self {
        Self::from_data(SnapshotData {
            houses,
            ..self.data.as_ref().clone()
        })
    }

    /// Copy with a different jedis collection, sharing everything else
    pub fn with_jedis(&self, jedis: EntityList<Jedi>) -> Self {
        Self::from_data(SnapshotData {
            jedis,
            ..self.data.as_ref().clone()
        })
    }

    /// Transform the houses collection
    pub fn update_houses<F>(&self, f: F) -> Self
    where
        F: FnOnce(&EntityList<House>) -> EntityList<House>,
    {
        self.with_houses(f(&self.data.houses))
    }

    /// Transform the jedis collection
    pub fn update_jedis<F>(&self, f: F) -> Self
    where
        F: FnOnce(&EntityList<Jedi>) -> EntityList<Jedi>,
    {
        self.with_jedis(f(&self.data.jedis))
    }

    /// Copy with one extension field set
    pub fn with_extension(&self, key: impl Into<String>, value: Value) -> Self {
        let mut extensions = self.data.extensions.as_ref().clone();
        extensions.insert(key.into(), value);
        Self::from_data(SnapshotData {
            extensions: Arc::new(extensions),
            ..self.data.as_ref().clone()
        })
    }

    /// Check the per-collection id uniqueness invariant
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntityId` for the first repeated id found.
    pub fn validate(&self) -> Result<()> {
        self.data.houses.validate_unique_ids()?;
        self.data.jedis.validate_unique_ids()
    }

    /// Parse a snapshot from its JSON form
    ///
    /// Unknown top-level keys are kept as extensions.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for malformed JSON and `DuplicateEntityId`
    /// when a collection repeats an id.
    pub fn from_json(json: &str) -> Result<Self> {
        let data: SnapshotData = serde_json::from_str(json)?;
        let snapshot = Self::from_data(data);
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Serialize to the JSON form accepted by [`Snapshot::from_json`]
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if an extension value cannot be encoded.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self.data.as_ref()).map_err(LiveDataError::from)
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.data.houses == other.data.houses
                && self.data.jedis == other.data.jedis
                && self.data.extensions == other.data.extensions)
    }
}
