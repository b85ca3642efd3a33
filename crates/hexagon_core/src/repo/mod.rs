//! Record persistence: query builder, store contract, SQLite store.
//!
//! # Responsibility
//! - Define the narrow store interface wrappers and services depend on.
//! - Keep SQL details inside the SQLite implementation.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NotFound`) in addition to transport
//!   errors, and never retry.

pub mod error;
pub mod query;
pub mod sqlite_store;

pub use error::{ModelError, ModelResult};
pub use query::{Filter, Query};
pub use sqlite_store::{RecordStore, SqliteRecordStore};
