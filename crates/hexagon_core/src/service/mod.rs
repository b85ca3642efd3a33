//! Services over records: accessor, CRUD and kind -> service resolution.
//!
//! # Responsibility
//! - Fetch and lock records through the store contract.
//! - Route CRUD calls through wrappers built by a factory.
//! - Resolve the service responsible for a kind or record.

pub mod crud_service;
pub mod model_service;
pub mod multiple;
pub mod resolver;

pub use crud_service::{CrudOperations, CrudService, WrapperFactory, WrapperResolver};
pub use model_service::{ModelService, Target};
pub use multiple::{ModelSubject, MultipleServices, ResolvesMultipleServices};
pub use resolver::{ResolveError, ResolveResult, Resolved, ServiceContainer, ServiceResolver};
