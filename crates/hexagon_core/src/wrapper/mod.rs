//! Record wrappers: validation, patching and status transitions over records.
//!
//! # Responsibility
//! - Bind one record to per-kind behavior declared by a definition.
//! - Persist through the `RecordStore` the wrapper was built with.
//!
//! # Invariants
//! - Wrappers never open or close transactions.

pub mod definition;
pub mod model_wrapper;
pub mod naming;
pub mod status;

pub use definition::{set_optional_field, AssignField, FieldSetter, WrapperDefinition};
pub use model_wrapper::{FieldRef, ModelWrapper, Updateable, WrapperIdentity, WrapperParts};
pub use status::{StatusBroadcast, StatusDefinition, StatusEvents, StatusWrapper};
