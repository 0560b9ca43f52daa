//! Built-in executor: renders a validated selection document over a snapshot.

#![allow(clippy::result_large_err)]

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::document::{parse_document, Document, OperationKind, Selection};
use super::executor::{ExecutionResult, FieldError, PathSegment, QueryExecutor};
use super::schema::TYPENAME;
use crate::errors::{ExError, LiveDataError};
use crate::model::{House, Jedi, Snapshot};

/// Executor for documents over the houses / jedis schema
#[derive(Debug, Clone)]
pub struct SelectionExecutor {
    document: Arc<Document>,
}

impl SelectionExecutor {
    /// Wrap a document after validating it
    ///
    /// # Errors
    ///
    /// Document-level validation errors.
    pub fn new(document: Document) -> Result<Self, ExError> {
        document.validate()?;
        Ok(Self {
            document: Arc::new(document),
        })
    }

    /// Parse, validate and wrap a document
    ///
    /// # Errors
    ///
    /// Syntax or validation errors, both document-level.
    pub fn from_source(source: &str) -> Result<Self, ExError> {
        Self::new(parse_document(source)?)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

impl QueryExecutor for SelectionExecutor {
    fn execute(&self, snapshot: &Snapshot) -> Result<ExecutionResult, ExError> {
        let mut render = Render::new(snapshot, self.document.operation);
        let data = render.root(&self.document.selections)?;
        Ok(ExecutionResult::from_data(data).with_errors(render.errors))
    }
}

/// Per-execution rendering state
struct Render<'a> {
    snapshot: &'a Snapshot,
    operation: OperationKind,
    houses_by_id: HashMap<&'a str, &'a House>,
    path: Vec<PathSegment>,
    errors: Vec<FieldError>,
}

impl<'a> Render<'a> {
    fn new(snapshot: &'a Snapshot, operation: OperationKind) -> Self {
        // First occurrence wins, matching EntityList::find
        let houses_by_id = snapshot
            .houses()
            .iter()
            .rev()
            .map(|h| (h.id.as_str(), &**h))
            .collect();
        Self {
            snapshot,
            operation,
            houses_by_id,
            path: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn root(&mut self, selections: &[Selection]) -> Result<Value, ExError> {
        let mut out = Map::new();
        for sel in selections {
            let key = sel.response_key();
            self.path.push(PathSegment::from(key));
            let value = match sel.name.as_str() {
                TYPENAME => Value::from(self.operation.root_type_name()),
                "houses" => {
                    let snapshot = self.snapshot;
                    let mut items = Vec::with_capacity(snapshot.houses().len());
                    for (i, house) in snapshot.houses().iter().enumerate() {
                        self.path.push(PathSegment::Index(i));
                        items.push(self.house(house, &sel.selections)?);
                        self.path.pop();
                    }
                    Value::Array(items)
                }
                "jedis" => {
                    let snapshot = self.snapshot;
                    let mut items = Vec::with_capacity(snapshot.jedis().len());
                    for (i, jedi) in snapshot.jedis().iter().enumerate() {
                        self.path.push(PathSegment::Index(i));
                        items.push(self.jedi(jedi, &sel.selections)?);
                        self.path.pop();
                    }
                    Value::Array(items)
                }
                other => return Err(self.unresolvable(other)),
            };
            self.path.pop();
            out.insert(key.to_string(), value);
        }
        Ok(Value::Object(out))
    }

    fn house(&mut self, house: &House, selections: &[Selection]) -> Result<Value, ExError> {
        let mut out = Map::new();
        for sel in selections {
            let value = match sel.name.as_str() {
                TYPENAME => Value::from("House"),
                "id" => Value::from(house.id.as_str()),
                "address" => Value::from(house.address.as_str()),
                "postalCode" => Value::from(house.postal_code.as_str()),
                "numberOfCats" => Value::from(house.number_of_cats),
                "numberOfDogs" => Value::from(house.number_of_dogs),
                other => return Err(self.unresolvable(other)),
            };
            out.insert(sel.response_key().to_string(), value);
        }
        Ok(Value::Object(out))
    }

    fn jedi(&mut self, jedi: &Jedi, selections: &[Selection]) -> Result<Value, ExError> {
        let mut out = Map::new();
        for sel in selections {
            let key = sel.response_key();
            self.path.push(PathSegment::from(key));
            let value = match sel.name.as_str() {
                TYPENAME => Value::from("Jedi"),
                "id" => Value::from(jedi.id.as_str()),
                "houseIDs" => Value::Array(jedi.house_ids.iter().map(|id| Value::from(id.as_str())).collect()),
                "houses" => {
                    let mut items = Vec::with_capacity(jedi.house_ids.len());
                    for (j, house_id) in jedi.house_ids.iter().enumerate() {
                        self.path.push(PathSegment::Index(j));
                        let item = match self.houses_by_id.get(house_id.as_str()).copied() {
                            Some(house) => self.house(house, &sel.selections)?,
                            None => {
                                self.errors.push(FieldError::new(
                                    format!("House \"{house_id}\" not found"),
                                    self.path.clone(),
                                ));
                                Value::Null
                            }
                        };
                        items.push(item);
                        self.path.pop();
                    }
                    Value::Array(items)
                }
                "primaryAddress" => match jedi.primary_address.as_deref() {
                    None => Value::Null,
                    Some(embedded) => {
                        // Render the live house when it still exists
                        let house = self
                            .houses_by_id
                            .get(embedded.id.as_str())
                            .copied()
                            .unwrap_or(embedded);
                        self.house(house, &sel.selections)?
                    }
                },
                other => return Err(self.unresolvable(other)),
            };
            self.path.pop();
            out.insert(key.to_string(), value);
        }
        Ok(Value::Object(out))
    }

    fn unresolvable(&self, field: &str) -> ExError {
        let path: Vec<String> = self.path.iter().map(ToString::to_string).collect();
        ExError::from(LiveDataError::ResolverFailed {
            path: path.join("."),
            reason: format!("no resolver for field \"{field}\""),
        })
    }
}
