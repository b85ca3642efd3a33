//! Generic create/update/patch/delete over wrappers.
//!
//! # Responsibility
//! - Turn fetched or blank records into wrappers through a factory.
//! - Run wrapper write paths and hand back the resulting record.
//!
//! # Invariants
//! - Every service owns a wrapper factory from construction on.
//! - Update-side fetches never lock.

use crate::model::{Data, ModelKind, Record};
use crate::repo::{ModelError, ModelResult, Query, RecordStore};
use crate::service::model_service::{ModelService, Target};
use crate::wrapper::model_wrapper::{Updateable, WrapperIdentity};
use log::{debug, info};

/// Builds the wrapper for one record.
pub trait WrapperFactory {
    type Wrapper: Updateable;

    fn make(&self, record: Record) -> ModelResult<Self::Wrapper>;
}

impl<F, W> WrapperFactory for F
where
    F: Fn(Record) -> ModelResult<W>,
    W: Updateable,
{
    type Wrapper = W;

    fn make(&self, record: Record) -> ModelResult<W> {
        self(record)
    }
}

/// Services that know how to wrap records of their kind.
pub trait WrapperResolver: ModelService {
    type Wrapper: Updateable;

    fn resolve_wrapper(&self, record: Record) -> ModelResult<Self::Wrapper>;

    /// Re-creates a wrapper from a stored identity.
    ///
    /// The record is re-fetched, so a deleted row fails with `NotFound`.
    fn restore_wrapper(&self, identity: &WrapperIdentity) -> ModelResult<Self::Wrapper> {
        let kind = self.kind();
        if identity.kind != kind.name {
            return Err(ModelError::ContractViolation(format!(
                "identity of {} cannot be restored by the {} service",
                identity.kind, kind.name
            )));
        }
        let record = self
            .get(identity.key, true, false)?
            .ok_or(ModelError::NotFound {
                kind: kind.name,
                key: Some(identity.key),
            })?;
        self.resolve_wrapper(record)
    }
}

/// Object-safe CRUD surface registered with a `ServiceResolver`.
pub trait CrudOperations {
    /// Validates and persists a new record built from `data`.
    fn create(&self, data: &Data) -> ModelResult<Record>;

    fn update(&self, target: Target, data: &Data) -> ModelResult<Record>;

    fn patch(&self, target: Target, data: &Data) -> ModelResult<Record>;

    fn delete(&self, target: Target) -> ModelResult<bool>;
}

impl<T: WrapperResolver> CrudOperations for T {
    fn create(&self, data: &Data) -> ModelResult<Record> {
        let mut wrapper = self.resolve_wrapper(Record::new(self.kind()))?;
        wrapper.validate(data, None)?;
        wrapper.save_data(data)?;

        let record = wrapper.into_model();
        info!(
            "event=record_create module=service status=ok kind={} key={:?}",
            self.kind().name,
            record.key()
        );
        Ok(record)
    }

    fn update(&self, target: Target, data: &Data) -> ModelResult<Record> {
        let mut wrapper = fetch_wrapper(self, target)?;
        Updateable::update(&mut wrapper, data)?;
        Ok(wrapper.into_model())
    }

    fn patch(&self, target: Target, data: &Data) -> ModelResult<Record> {
        let mut wrapper = fetch_wrapper(self, target)?;
        Updateable::patch(&mut wrapper, data)?;
        Ok(wrapper.into_model())
    }

    fn delete(&self, target: Target) -> ModelResult<bool> {
        let mut wrapper = fetch_wrapper(self, target)?;
        let deleted = Updateable::delete(&mut wrapper)?;
        info!(
            "event=record_delete module=service status={} kind={}",
            if deleted { "ok" } else { "noop" },
            self.kind().name
        );
        Ok(deleted)
    }
}

fn fetch_wrapper<T: WrapperResolver>(
    service: &T,
    target: Target,
) -> ModelResult<T::Wrapper> {
    let kind = service.kind();
    let record = service
        .get(target, true, false)?
        .ok_or(ModelError::NotFound {
            kind: kind.name,
            key: None,
        })?;
    service.resolve_wrapper(record)
}

/// CRUD service for one kind, backed by a store and a wrapper factory.
pub struct CrudService<'s, F> {
    kind: &'static ModelKind,
    store: &'s dyn RecordStore,
    wrappers: F,
    scope: Option<Box<dyn Fn(Query) -> Query + 's>>,
}

impl<'s, F: WrapperFactory> CrudService<'s, F> {
    pub fn new(kind: &'static ModelKind, store: &'s dyn RecordStore, wrappers: F) -> Self {
        debug!(
            "event=service_new module=service status=ok kind={}",
            kind.name
        );
        Self {
            kind,
            store,
            wrappers,
            scope: None,
        }
    }

    /// Narrows every base query, e.g. to exclude archived rows.
    pub fn with_scope(mut self, scope: impl Fn(Query) -> Query + 's) -> Self {
        self.scope = Some(Box::new(scope));
        self
    }
}

impl<F: WrapperFactory> ModelService for CrudService<'_, F> {
    fn kind(&self) -> &'static ModelKind {
        self.kind
    }

    fn store(&self) -> &dyn RecordStore {
        self.store
    }

    fn get_query(&self) -> Query {
        let query = Query::new(self.kind);
        match &self.scope {
            Some(scope) => scope(query),
            None => query,
        }
    }
}

impl<F: WrapperFactory> WrapperResolver for CrudService<'_, F> {
    type Wrapper = F::Wrapper;

    fn resolve_wrapper(&self, record: Record) -> ModelResult<F::Wrapper> {
        self.wrappers.make(record)
    }
}
