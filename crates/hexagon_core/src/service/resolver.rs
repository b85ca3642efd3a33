//! Kind -> service registry backed by an identifier container.
//!
//! # Responsibility
//! - Map canonical kind names to service identifiers.
//! - Turn identifiers into services, deferring to `MultipleServices` when
//!   a kind has several.
//!
//! # Invariants
//! - The last registration for a kind wins.
//! - Unknown kinds and unbound identifiers fail with `BindingResolution`.

use crate::service::multiple::{ModelSubject, MultipleServices};
use log::debug;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Service lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    BindingResolution(String),
    /// `MultipleServices::resolve` ran before a subject was set.
    UnsetModel,
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BindingResolution(message) => write!(f, "binding resolution failed: {message}"),
            Self::UnsetModel => write!(f, "no model set on multiple services resolver"),
        }
    }
}

impl Error for ResolveError {}

pub type ResolveResult<T> = Result<T, ResolveError>;

enum Binding<'a, S: ?Sized> {
    Single(Box<dyn Fn() -> Arc<S> + 'a>),
    Multiple(Box<dyn Fn() -> MultipleServices<'a, S> + 'a>),
}

/// What a container identifier produced.
pub enum Resolved<'a, S: ?Sized> {
    Service(Arc<S>),
    Multiple(MultipleServices<'a, S>),
}

/// Identifier -> factory map.
pub struct ServiceContainer<'a, S: ?Sized> {
    bindings: BTreeMap<String, Binding<'a, S>>,
}

impl<S: ?Sized> Default for ServiceContainer<'_, S> {
    fn default() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }
}

impl<'a, S: ?Sized> ServiceContainer<'a, S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, id: impl Into<String>, factory: impl Fn() -> Arc<S> + 'a) -> &mut Self {
        self.bindings
            .insert(id.into(), Binding::Single(Box::new(factory)));
        self
    }

    pub fn bind_multi(
        &mut self,
        id: impl Into<String>,
        factory: impl Fn() -> MultipleServices<'a, S> + 'a,
    ) -> &mut Self {
        self.bindings
            .insert(id.into(), Binding::Multiple(Box::new(factory)));
        self
    }

    pub fn has(&self, id: &str) -> bool {
        self.bindings.contains_key(id)
    }

    pub fn make(&self, id: &str) -> ResolveResult<Resolved<'a, S>> {
        match self.bindings.get(id) {
            Some(Binding::Single(factory)) => Ok(Resolved::Service(factory())),
            Some(Binding::Multiple(factory)) => Ok(Resolved::Multiple(factory())),
            None => Err(ResolveError::BindingResolution(format!(
                "identifier is not bound: {id}"
            ))),
        }
    }
}

/// Registry from record kind to the service responsible for it.
pub struct ServiceResolver<'a, S: ?Sized> {
    container: ServiceContainer<'a, S>,
    services: BTreeMap<&'static str, String>,
}

impl<'a, S: ?Sized> ServiceResolver<'a, S> {
    pub fn new(container: ServiceContainer<'a, S>) -> Self {
        Self {
            container,
            services: BTreeMap::new(),
        }
    }

    pub fn container(&self) -> &ServiceContainer<'a, S> {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut ServiceContainer<'a, S> {
        &mut self.container
    }

    /// Binds the subject's kind to `service_id`, replacing earlier entries.
    pub fn register(
        &mut self,
        subject: impl Into<ModelSubject>,
        service_id: impl Into<String>,
    ) -> &mut Self {
        let kind = subject.into().kind_name();
        let service_id = service_id.into();
        debug!("event=service_register module=service status=ok kind={kind} id={service_id}");
        self.services.insert(kind, service_id);
        self
    }

    pub fn service_id(&self, kind: &str) -> Option<&str> {
        self.services.get(kind).map(String::as_str)
    }

    /// Service for `subject`'s kind.
    ///
    /// # Errors
    /// - `BindingResolution` for unregistered kinds or unbound identifiers,
    ///   or when a multi binding has no match and no default.
    pub fn resolve(&self, subject: impl Into<ModelSubject>) -> ResolveResult<Arc<S>> {
        let subject = subject.into();
        let kind = subject.kind_name();
        let service_id = self.services.get(kind).ok_or_else(|| {
            ResolveError::BindingResolution(format!("no service registered for {kind}"))
        })?;

        match self.container.make(service_id)? {
            Resolved::Service(service) => Ok(service),
            Resolved::Multiple(mut multiple) => {
                multiple.set_model(subject);
                multiple.resolve()
            }
        }
    }
}
