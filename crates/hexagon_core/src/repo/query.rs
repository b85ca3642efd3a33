//! Filtered single-kind query with an optional lock-for-update modifier.

use crate::model::{ModelKind, Record, RecordKey};
use crate::repo::sqlite_store::RecordStore;
use crate::repo::{ModelError, ModelResult};
use serde_json::Value;

/// Equality predicate on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

/// Query scoped to one `ModelKind`.
///
/// Filters are ANDed; rows are visited in primary-key order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    kind: &'static ModelKind,
    filters: Vec<Filter>,
    lock: bool,
}

impl Query {
    pub fn new(kind: &'static ModelKind) -> Self {
        Self {
            kind,
            filters: Vec::new(),
            lock: false,
        }
    }

    pub fn kind(&self) -> &'static ModelKind {
        self.kind
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn where_key(self, key: RecordKey) -> Self {
        let column = self.kind.primary_key;
        self.where_eq(column, key)
    }

    /// Asks the store to hold a write lock on matched rows until the
    /// enclosing transaction ends.
    pub fn lock_for_update(mut self) -> Self {
        self.lock = true;
        self
    }

    pub fn is_lock_for_update(&self) -> bool {
        self.lock
    }

    pub fn first(&self, store: &dyn RecordStore) -> ModelResult<Option<Record>> {
        store.first(self)
    }

    pub fn first_or_fail(&self, store: &dyn RecordStore) -> ModelResult<Record> {
        self.first(store)?.ok_or(ModelError::NotFound {
            kind: self.kind.name,
            key: None,
        })
    }

    pub fn find(&self, store: &dyn RecordStore, key: RecordKey) -> ModelResult<Option<Record>> {
        self.clone().where_key(key).first(store)
    }

    /// Primary-key lookup; an absent key counts as missing.
    pub fn find_or_fail(
        &self,
        store: &dyn RecordStore,
        key: Option<RecordKey>,
    ) -> ModelResult<Record> {
        let not_found = ModelError::NotFound {
            kind: self.kind.name,
            key,
        };
        match key {
            Some(key) => self.find(store, key)?.ok_or(not_found),
            None => Err(not_found),
        }
    }
}
