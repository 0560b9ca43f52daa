//! The fixed live-data schema.
//!
//! ```text
//! type Query / Subscription { houses: [House]  jedis: [Jedi] }
//! type House { id  address  postalCode  numberOfCats  numberOfDogs }
//! type Jedi  { id  houseIDs  houses: [House]  primaryAddress: House }
//! ```
//!
//! `__typename` is available on every object type.

use std::collections::HashMap;

use super::document::{Document, Selection};
use crate::errors::{LiveDataError, Result};

pub const TYPENAME: &str = "__typename";

/// Object types of the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Root,
    House,
    Jedi,
}

/// Shape of a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Scalar,
    /// Nullable single object
    Object(ObjectType),
    List(ObjectType),
}

impl FieldType {
    fn object_type(&self) -> Option<ObjectType> {
        match self {
            FieldType::Scalar => None,
            FieldType::Object(t) | FieldType::List(t) => Some(*t),
        }
    }
}

impl ObjectType {
    pub fn name(&self, root_name: &'static str) -> &'static str {
        match self {
            ObjectType::Root => root_name,
            ObjectType::House => "House",
            ObjectType::Jedi => "Jedi",
        }
    }

    /// Type of `field` on this object, `None` if the field does not exist
    pub fn field(&self, field: &str) -> Option<FieldType> {
        if field == TYPENAME {
            return Some(FieldType::Scalar);
        }
        match (self, field) {
            (ObjectType::Root, "houses") => Some(FieldType::List(ObjectType::House)),
            (ObjectType::Root, "jedis") => Some(FieldType::List(ObjectType::Jedi)),

            (ObjectType::House, "id" | "address" | "postalCode" | "numberOfCats" | "numberOfDogs") => {
                Some(FieldType::Scalar)
            }

            (ObjectType::Jedi, "id" | "houseIDs") => Some(FieldType::Scalar),
            (ObjectType::Jedi, "houses") => Some(FieldType::List(ObjectType::House)),
            (ObjectType::Jedi, "primaryAddress") => Some(FieldType::Object(ObjectType::House)),

            _ => None,
        }
    }
}

/// Validate a document against the schema
///
/// # Errors
///
/// The first `UnknownField`, `MissingSubselection`,
/// `UnexpectedSubselection` or `ConflictingResponseKey` found in document
/// order. Repeating an identical selection is allowed.
pub fn validate(document: &Document) -> Result<()> {
    let root_name = document.operation.root_type_name();
    validate_selections(ObjectType::Root, root_name, &document.selections)
}

fn validate_selections(parent: ObjectType, root_name: &'static str, selections: &[Selection]) -> Result<()> {
    let mut by_key: HashMap<&str, &Selection> = HashMap::new();
    for selection in selections {
        let type_name = parent.name(root_name).to_string();
        if let Some(earlier) = by_key.insert(selection.response_key(), selection) {
            // Output is keyed by response key; anything but an exact repeat would be overwritten
            if earlier.name != selection.name || earlier.selections != selection.selections {
                return Err(LiveDataError::ConflictingResponseKey {
                    type_name,
                    key: selection.response_key().to_string(),
                });
            }
        }
        let field_type = parent
            .field(&selection.name)
            .ok_or_else(|| LiveDataError::UnknownField {
                type_name: type_name.clone(),
                field: selection.name.clone(),
            })?;

        match (field_type.object_type(), selection.selections.is_empty()) {
            (None, false) => {
                return Err(LiveDataError::UnexpectedSubselection {
                    type_name,
                    field: selection.name.clone(),
                });
            }
            (Some(_), true) => {
                return Err(LiveDataError::MissingSubselection {
                    type_name,
                    field: selection.name.clone(),
                });
            }
            (Some(child), false) => validate_selections(child, root_name, &selection.selections)?,
            (None, true) => {}
        }
    }
    Ok(())
}
