//! Mutable record with change tracking and lock state.
//!
//! # Invariants
//! - `original` mirrors the last persisted attribute values.
//! - The lock flag is never persisted and starts as `false`.

use crate::model::kind::ModelKind;
use crate::repo::{ModelError, ModelResult};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Field map used for record attributes and caller-supplied input.
pub type Data = Map<String, Value>;

/// Integer primary key.
pub type RecordKey = i64;

/// Capability of carrying a "fetched under row lock" flag.
pub trait SupportsLocking {
    fn is_locked(&self) -> bool;
    fn set_locked(&mut self, locked: bool);
}

/// One row of a `ModelKind`, detached from any connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    kind: &'static ModelKind,
    attributes: Data,
    original: Data,
    exists: bool,
    locked: bool,
}

impl Record {
    /// Blank, not yet persisted record.
    pub fn new(kind: &'static ModelKind) -> Self {
        Self {
            kind,
            attributes: Data::new(),
            original: Data::new(),
            exists: false,
            locked: false,
        }
    }

    /// Record loaded from storage; its attributes are the persisted baseline.
    pub(crate) fn from_storage(kind: &'static ModelKind, attributes: Data) -> Self {
        Self {
            kind,
            original: attributes.clone(),
            attributes,
            exists: true,
            locked: false,
        }
    }

    pub fn kind(&self) -> &'static ModelKind {
        self.kind
    }

    pub fn key(&self) -> Option<RecordKey> {
        self.attributes
            .get(self.kind.primary_key)
            .and_then(Value::as_i64)
    }

    /// Whether the record has a backing row.
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    pub fn attributes(&self) -> &Data {
        &self.attributes
    }

    /// Assigns one attribute in memory.
    ///
    /// # Errors
    /// - `UnknownField` when `field` is neither the key nor a declared column.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> ModelResult<()> {
        if !self.kind.is_assignable(field) {
            return Err(ModelError::UnknownField {
                kind: self.kind.name,
                field: field.to_string(),
            });
        }
        self.attributes.insert(field.to_string(), value.into());
        Ok(())
    }

    /// Assigns every entry of `data`, stopping at the first unknown field.
    pub fn fill(&mut self, data: &Data) -> ModelResult<()> {
        for (field, value) in data {
            self.set(field, value.clone())?;
        }
        Ok(())
    }

    /// Last persisted value of `field`.
    pub fn original(&self, field: &str) -> Option<&Value> {
        self.original.get(field)
    }

    pub fn is_dirty(&self, field: &str) -> bool {
        self.attributes.get(field) != self.original.get(field)
    }

    /// Attribute names whose value differs from the persisted baseline.
    pub fn dirty_fields(&self) -> Vec<&str> {
        self.attributes
            .keys()
            .chain(self.original.keys())
            .map(String::as_str)
            .filter(|field| self.is_dirty(field))
            .fold(Vec::new(), |mut fields, field| {
                if !fields.contains(&field) {
                    fields.push(field);
                }
                fields
            })
    }

    pub(crate) fn mark_persisted(&mut self, key: RecordKey) {
        self.attributes
            .insert(self.kind.primary_key.to_string(), Value::from(key));
        self.original = self.attributes.clone();
        self.exists = true;
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.exists = false;
    }
}

impl SupportsLocking for Record {
    fn is_locked(&self) -> bool {
        self.locked
    }

    fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::{Record, SupportsLocking};
    use crate::model::kind::{Column, ColumnType, ModelKind};
    use crate::repo::ModelError;
    use serde_json::json;

    static NOTE: ModelKind = ModelKind::new(
        "note",
        "notes",
        &[
            Column::new("title", ColumnType::Text),
            Column::new("pinned", ColumnType::Boolean),
        ],
    );

    #[test]
    fn new_record_is_unlocked_and_not_persisted() {
        let record = Record::new(&NOTE);
        assert!(!record.exists());
        assert!(!record.is_locked());
        assert_eq!(record.key(), None);
    }

    #[test]
    fn set_rejects_undeclared_fields() {
        let mut record = Record::new(&NOTE);
        let err = record.set("secret", "x").unwrap_err();
        assert!(matches!(
            err,
            ModelError::UnknownField { kind: "note", ref field } if field == "secret"
        ));
    }

    #[test]
    fn dirty_tracking_follows_persisted_baseline() {
        let mut record = Record::new(&NOTE);
        record.set("title", "draft").unwrap();
        assert_eq!(record.dirty_fields(), vec!["title"]);

        record.mark_persisted(7);
        assert!(record.dirty_fields().is_empty());
        assert_eq!(record.key(), Some(7));

        record.set("title", "final").unwrap();
        assert!(record.is_dirty("title"));
        assert!(!record.is_dirty("pinned"));
        assert_eq!(record.original("title"), Some(&json!("draft")));
    }

    #[test]
    fn serializes_as_attribute_map() {
        let mut record = Record::new(&NOTE);
        record.set("title", "hello").unwrap();
        record.set("pinned", true).unwrap();

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"title": "hello", "pinned": true}));
    }
}
