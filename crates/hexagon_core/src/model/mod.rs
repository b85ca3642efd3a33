//! Record model shared by stores, wrappers and services.
//!
//! # Responsibility
//! - Describe record types (`ModelKind`) the way the host schema declares them.
//! - Hold mutable records with change tracking and lock state.
//!
//! # Invariants
//! - A record's kind is fixed at construction.
//! - Only declared columns and the primary key are assignable.

pub mod kind;
pub mod record;

pub use kind::{Column, ColumnType, ModelKind};
pub use record::{Data, Record, RecordKey, SupportsLocking};
