//! Record accessor: key/record/query lookups with optional row locking.
//!
//! # Responsibility
//! - Resolve a `Target` into a record of the service's kind.
//! - Re-fetch under lock-for-update only when the caller asks for a lock
//!   the record does not already hold.
//!
//! # Invariants
//! - A record target is returned untouched when no lock is requested or it
//!   is already locked.
//! - Every fetched record has its lock flag overwritten with the request.

use crate::model::{ModelKind, Record, RecordKey, SupportsLocking};
use crate::repo::{ModelError, ModelResult, Query, RecordStore};
use crate::wrapper::model_wrapper::ensure_same_kind;
use log::debug;

/// What `get` should look up.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Key(RecordKey),
    Record(Record),
    /// No identifier was supplied.
    Missing,
}

impl From<RecordKey> for Target {
    fn from(key: RecordKey) -> Self {
        Self::Key(key)
    }
}

impl From<Option<RecordKey>> for Target {
    fn from(key: Option<RecordKey>) -> Self {
        key.map_or(Self::Missing, Self::Key)
    }
}

impl From<Record> for Target {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

/// Read-side access to one record kind.
pub trait ModelService {
    fn kind(&self) -> &'static ModelKind;

    fn store(&self) -> &dyn RecordStore;

    /// Base query for every lookup; override to add default scoping.
    fn get_query(&self) -> Query {
        Query::new(self.kind())
    }

    /// Fetches `target`, optionally under lock-for-update.
    ///
    /// The lock flag reports what was requested, not what the store holds:
    /// outside a transaction the store takes no lock, yet the fetched record
    /// is still flagged locked, and later locked `get`s of that record return
    /// it without re-fetching. Fetch under a transaction when the lock must
    /// outlive the call.
    ///
    /// # Errors
    /// - `NotFound` when `fail_on_missing` and nothing matches.
    /// - `ContractViolation` for a record of another kind.
    fn get(
        &self,
        target: impl Into<Target>,
        fail_on_missing: bool,
        lock: bool,
    ) -> ModelResult<Option<Record>> {
        let kind = self.kind();
        let key = match target.into() {
            Target::Record(record) => {
                ensure_same_kind(kind, &record)?;
                if !lock || record.is_locked() {
                    return Ok(Some(record));
                }
                record.key()
            }
            Target::Key(key) => Some(key),
            Target::Missing => None,
        };

        let Some(key) = key else {
            return if fail_on_missing {
                Err(ModelError::NotFound {
                    kind: kind.name,
                    key: None,
                })
            } else {
                Ok(None)
            };
        };

        debug!(
            "event=model_get module=service status=start kind={} key={key} lock={lock}",
            kind.name
        );
        let query = lock_if(self.get_query(), lock);
        let found = if fail_on_missing {
            Some(query.find_or_fail(self.store(), Some(key))?)
        } else {
            query.find(self.store(), key)?
        };
        Ok(found.map(|record| with_lock_flag(record, lock)))
    }

    fn get_locked(
        &self,
        target: impl Into<Target>,
        fail_on_missing: bool,
    ) -> ModelResult<Option<Record>> {
        self.get(target, fail_on_missing, true)
    }

    /// First match of a caller-built query, optionally under lock-for-update.
    fn get_from_query(
        &self,
        query: Query,
        fail_on_missing: bool,
        lock: bool,
    ) -> ModelResult<Option<Record>> {
        let query = lock_if(query, lock);
        let found = if fail_on_missing {
            Some(query.first_or_fail(self.store())?)
        } else {
            query.first(self.store())?
        };
        Ok(found.map(|record| with_lock_flag(record, lock)))
    }

    fn get_locked_from_query(
        &self,
        query: Query,
        fail_on_missing: bool,
    ) -> ModelResult<Option<Record>> {
        self.get_from_query(query, fail_on_missing, true)
    }
}

fn lock_if(query: Query, lock: bool) -> Query {
    if lock {
        query.lock_for_update()
    } else {
        query
    }
}

fn with_lock_flag(mut record: Record, lock: bool) -> Record {
    record.set_locked(lock);
    record
}
