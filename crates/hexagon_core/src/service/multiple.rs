//! Attribute-driven choice among several services for one kind.

use crate::model::{ModelKind, Record};
use crate::service::resolver::{ResolveError, ResolveResult};
use std::sync::Arc;

/// What a service lookup is keyed on.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSubject {
    Kind(&'static ModelKind),
    Record(Record),
}

impl ModelSubject {
    pub fn kind(&self) -> &'static ModelKind {
        match self {
            Self::Kind(kind) => kind,
            Self::Record(record) => record.kind(),
        }
    }

    /// Canonical registry key.
    pub fn kind_name(&self) -> &'static str {
        self.kind().name
    }

    pub fn record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Kind(_) => None,
        }
    }
}

impl From<&'static ModelKind> for ModelSubject {
    fn from(kind: &'static ModelKind) -> Self {
        Self::Kind(kind)
    }
}

impl From<Record> for ModelSubject {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<&Record> for ModelSubject {
    fn from(record: &Record) -> Self {
        Self::Record(record.clone())
    }
}

/// Picks a service from record attributes.
pub trait ResolvesMultipleServices<S: ?Sized> {
    /// Service for this record, or `None` to fall back to `default_service`.
    fn resolve_service(&self, record: &Record) -> Option<Arc<S>>;

    /// Fallback for kind-only subjects and unmatched records.
    fn default_service(&self, subject: &ModelSubject) -> ResolveResult<Arc<S>> {
        Err(ResolveError::BindingResolution(format!(
            "no default service for {}",
            subject.kind_name()
        )))
    }
}

impl<S, F> ResolvesMultipleServices<S> for F
where
    S: ?Sized,
    F: Fn(&Record) -> Option<Arc<S>>,
{
    fn resolve_service(&self, record: &Record) -> Option<Arc<S>> {
        self(record)
    }
}

/// Deferred resolver bound in a `ServiceContainer` in place of a service.
pub struct MultipleServices<'a, S: ?Sized> {
    strategy: Box<dyn ResolvesMultipleServices<S> + 'a>,
    model: Option<ModelSubject>,
}

impl<'a, S: ?Sized> MultipleServices<'a, S> {
    pub fn new(strategy: impl ResolvesMultipleServices<S> + 'a) -> Self {
        Self {
            strategy: Box::new(strategy),
            model: None,
        }
    }

    pub fn set_model(&mut self, subject: impl Into<ModelSubject>) -> &mut Self {
        self.model = Some(subject.into());
        self
    }

    pub fn model(&self) -> Option<&ModelSubject> {
        self.model.as_ref()
    }

    /// # Errors
    /// - `UnsetModel` before `set_model`.
    /// - `BindingResolution` from the default fallback.
    pub fn resolve(&self) -> ResolveResult<Arc<S>> {
        let subject = self.model.as_ref().ok_or(ResolveError::UnsetModel)?;
        let resolved = subject
            .record()
            .and_then(|record| self.strategy.resolve_service(record));
        match resolved {
            Some(service) => Ok(service),
            None => self.strategy.default_service(subject),
        }
    }
}
