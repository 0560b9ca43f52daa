//! Ordered, keyed, structurally shared entity collections.
//!
//! An [`EntityList`] is an immutable sequence of `Arc<T>`. Every edit copies
//! the spine (the vector of pointers) and reuses the `Arc` of every entity it
//! did not touch, so an unchanged entity is pointer-identical across
//! snapshots and the change detector can skip it in O(1).

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{LiveDataError, Result};

/// A keyed record stored in an [`EntityList`]
pub trait Entity: Clone + PartialEq + Debug {
    /// Name of the top-level collection holding this entity
    const COLLECTION: &'static str;

    /// Stable identity of the entity
    fn id(&self) -> &str;
}

/// Immutable ordered collection of entities with structural sharing
#[derive(Debug)]
pub struct EntityList<T> {
    items: Arc<Vec<Arc<T>>>,
}

impl<T> Clone for EntityList<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for EntityList<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
        }
    }
}

impl<T: Entity> EntityList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    fn from_arcs(items: Vec<Arc<T>>) -> Self {
        Self {
            items: Arc::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate entities in order
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<T>> {
        self.items.iter()
    }

    /// Entity at a position
    pub fn get(&self, index: usize) -> Option<&Arc<T>> {
        self.items.get(index)
    }

    /// First entity with the given id
    pub fn find(&self, id: &str) -> Option<&Arc<T>> {
        self.items.iter().find(|e| e.id() == id)
    }

    /// Ids in positional order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|e| e.id())
    }

    /// True when both lists share the same spine
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    /// Append an entity
    pub fn push(&self, item: T) -> Self {
        self.push_shared(Arc::new(item))
    }

    /// Append an already shared entity
    pub fn push_shared(&self, item: Arc<T>) -> Self {
        let mut items = self.items.as_ref().clone();
        items.push(item);
        Self::from_arcs(items)
    }

    /// Drop the first `start` entities
    pub fn slice_from(&self, start: usize) -> Self {
        let start = start.min(self.items.len());
        Self::from_arcs(self.items[start..].to_vec())
    }

    /// Replace the entity at `index`; out-of-range indexes leave the list as is
    pub fn set(&self, index: usize, item: T) -> Self {
        self.update(index, |_| item)
    }

    /// Rewrite the entity at `index`; out-of-range indexes leave the list as is
    pub fn update<F>(&self, index: usize, f: F) -> Self
    where
        F: FnOnce(&T) -> T,
    {
        match self.items.get(index) {
            Some(current) => {
                let next = f(current);
                let mut items = self.items.as_ref().clone();
                items[index] = Arc::new(next);
                Self::from_arcs(items)
            }
            None => self.clone(),
        }
    }

    /// Rewrite the first entity with the given id
    pub fn update_by_id<F>(&self, id: &str, f: F) -> Self
    where
        F: FnOnce(&T) -> T,
    {
        match self.items.iter().position(|e| e.id() == id) {
            Some(index) => self.update(index, f),
            None => self.clone(),
        }
    }

    /// Remove every entity with the given id
    pub fn remove_by_id(&self, id: &str) -> Self {
        Self::from_arcs(
            self.items
                .iter()
                .filter(|e| e.id() != id)
                .cloned()
                .collect(),
        )
    }

    /// Rewrite every entity
    pub fn map<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&T) -> T,
    {
        Self::from_arcs(self.items.iter().map(|e| Arc::new(f(e))).collect())
    }

    /// Fail on the first id that appears twice
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntityId` naming the collection and the repeated id.
    pub fn validate_unique_ids(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for entity in self.items.iter() {
            if !seen.insert(entity.id()) {
                return Err(LiveDataError::DuplicateEntityId {
                    collection: T::COLLECTION.to_string(),
                    entity_id: entity.id().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl<T: Entity> FromIterator<T> for EntityList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_arcs(iter.into_iter().map(Arc::new).collect())
    }
}

impl<T: Entity> From<Vec<T>> for EntityList<T> {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<'a, T: Entity> IntoIterator for &'a EntityList<T> {
    type Item = &'a Arc<T>;
    type IntoIter = std::slice::Iter<'a, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Pointer equality first, element-wise value equality otherwise
impl<T: PartialEq> PartialEq for EntityList<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
            || (self.items.len() == other.items.len()
                && self
                    .items
                    .iter()
                    .zip(other.items.iter())
                    .all(|(a, b)| Arc::ptr_eq(a, b) || a == b))
    }
}

impl<T: Serialize> Serialize for EntityList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for EntityList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let items = Vec::<Arc<T>>::deserialize(deserializer)?;
        Ok(Self {
            items: Arc::new(items),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::House;

    fn two_houses() -> EntityList<House> {
        vec![
            House::new("h1", "1 Main St.", "10001"),
            House::new("h2", "2 Main St.", "10002"),
        ]
        .into()
    }

    #[test]
    fn test_push_shares_untouched_entities() {
        let list = two_houses();
        let next = list.push(House::new("h3", "3 Main St.", "10003"));
        assert_eq!(next.len(), 3);
        assert!(!next.ptr_eq(&list));
        assert!(Arc::ptr_eq(list.get(0).unwrap(), next.get(0).unwrap()));
        assert!(Arc::ptr_eq(list.get(1).unwrap(), next.get(1).unwrap()));
        assert_eq!(next.get(2).unwrap().id, "h3");
    }

    #[test]
    fn test_update_replaces_only_target() {
        let list = two_houses();
        let next = list.update(0, |h| h.with_pets(200, 0));
        assert!(!Arc::ptr_eq(list.get(0).unwrap(), next.get(0).unwrap()));
        assert!(Arc::ptr_eq(list.get(1).unwrap(), next.get(1).unwrap()));
        assert_eq!(next.get(0).unwrap().number_of_cats, 200);
        // original untouched
        assert_eq!(list.get(0).unwrap().number_of_cats, 0);
    }

    #[test]
    fn test_update_out_of_range_is_identity() {
        let list = two_houses();
        let next = list.update(7, |h| h.with_pets(1, 1));
        assert!(next.ptr_eq(&list));
    }

    #[test]
    fn test_slice_from_drops_prefix() {
        let list = two_houses();
        let next = list.slice_from(1);
        assert_eq!(next.ids().collect::<Vec<_>>(), vec!["h2"]);
        assert!(list.slice_from(9).is_empty());
    }

    #[test]
    fn test_value_equality_without_sharing() {
        let a = two_houses();
        let b = two_houses();
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
        assert_ne!(a, b.slice_from(1));
    }

    #[test]
    fn test_validate_unique_ids_reports_duplicate() {
        let list = two_houses().push(House::new("h1", "elsewhere", "99999"));
        let err = list.validate_unique_ids().unwrap_err();
        assert_eq!(
            err,
            LiveDataError::DuplicateEntityId {
                collection: "houses".to_string(),
                entity_id: "h1".to_string(),
            }
        );
        assert!(two_houses().validate_unique_ids().is_ok());
    }

    #[test]
    fn test_update_by_id_and_remove_by_id() {
        let list = two_houses();
        let next = list.update_by_id("h2", |h| h.with_address("2 Main St. apt. 2"));
        assert_eq!(next.find("h2").unwrap().address, "2 Main St. apt. 2");
        let removed = next.remove_by_id("h1");
        assert_eq!(removed.ids().collect::<Vec<_>>(), vec!["h2"]);
        assert!(list.update_by_id("missing", |h| h.clone()).ptr_eq(&list));
    }
}
