//! Entity record and collection types.
//!
//! Records are kept as loosely typed JSON objects because every collection
//! carries its own schema. Only the `id` field and the declared reference
//! fields are interpreted by the seeder.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the field holding a record's identifier.
pub const ID_FIELD: &str = "id";

/// A single record: a mapping from field name to JSON value.
///
/// Every record that enters the seeding pipeline carries a string `id` that
/// is unique within its collection. Before insertion this is a placeholder
/// id that other records may reference; the record store assigns the
/// canonical id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRecord {
    fields: Map<String, Value>,
}

impl EntityRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// The record's id, if present and a string.
    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Overwrite the record's id.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.fields
            .insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Set a field, returning the previous value if there was one.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(field.into(), value)
    }

    /// Remove a field, returning its value if it was present.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Read a field as a reference value.
    ///
    /// Returns `None` when the field is absent, null, or not shaped like a
    /// reference (a string or a list of strings).
    pub fn reference(&self, field: &str) -> Option<ReferenceValue> {
        self.fields.get(field).and_then(ReferenceValue::from_value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for EntityRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl TryFrom<Value> for EntityRecord {
    type Error = Value;

    /// Convert a JSON value into a record. Anything but an object is handed
    /// back unchanged as the error.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(other),
        }
    }
}

/// The value of a reference field.
///
/// A reference field points at one record (`Single`) or at an ordered list of
/// records (`Many`). An empty string is the store's representation of an
/// unset single reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceValue {
    Single(String),
    Many(Vec<String>),
}

impl ReferenceValue {
    /// Interpret a JSON value as a reference.
    ///
    /// Lists must contain only strings; a list with any other element is not
    /// a reference.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(id) => Some(Self::Single(id.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Self::Many),
            _ => None,
        }
    }

    /// The referenced ids, skipping empty strings.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Self::Single(id) if id.is_empty() => Vec::new(),
            Self::Single(id) => vec![id.as_str()],
            Self::Many(ids) => ids
                .iter()
                .map(String::as_str)
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    pub fn is_single(&self) -> bool {
        matches!(self, Self::Single(_))
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Single(id) => Value::String(id),
            Self::Many(ids) => Value::Array(ids.into_iter().map(Value::String).collect()),
        }
    }
}

/// An ordered sequence of records of one kind.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityCollection {
    name: String,
    records: Vec<EntityRecord>,
}

impl EntityCollection {
    pub fn new(name: impl Into<String>, records: Vec<EntityRecord>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    /// Create an empty collection.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [EntityRecord] {
        &mut self.records
    }

    pub fn push(&mut self, record: EntityRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityRecord> {
        self.records.iter()
    }

    /// Ids of all records that carry one, in collection order.
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().filter_map(EntityRecord::id).collect()
    }

    /// Find a record by its current id.
    pub fn find(&self, id: &str) -> Option<&EntityRecord> {
        self.records.iter().find(|record| record.id() == Some(id))
    }

    pub fn into_records(self) -> Vec<EntityRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a EntityCollection {
    type Item = &'a EntityRecord;
    type IntoIter = std::slice::Iter<'a, EntityRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
