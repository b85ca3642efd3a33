//! Record wrappers and service resolution over a SQLite-backed store.
//! Wrappers own validation and write rules; services own lookup and locking.

pub mod config;
pub mod db;
pub mod events;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod validation;
pub mod wrapper;

pub use config::{ConfigError, CoreConfig};
pub use db::{ensure_kind_ready, open_db, open_db_in_memory, DbError, DbResult};
pub use events::{
    Broadcaster, EventDispatcher, LogEvents, PublishedBroadcast, RecordingEvents, StatusChanged,
};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::{Column, ColumnType, Data, ModelKind, Record, RecordKey, SupportsLocking};
pub use repo::{ModelError, ModelResult, Query, RecordStore, SqliteRecordStore};
pub use service::{
    CrudOperations, CrudService, ModelService, ModelSubject, MultipleServices, ResolveError,
    ResolvesMultipleServices, ServiceContainer, ServiceResolver, Target, WrapperFactory,
    WrapperResolver,
};
pub use validation::{validate, Rule, Rules, ValidationError};
pub use wrapper::{
    AssignField, FieldRef, FieldSetter, ModelWrapper, StatusBroadcast, StatusDefinition,
    StatusEvents, StatusWrapper, Updateable, WrapperDefinition, WrapperIdentity,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
