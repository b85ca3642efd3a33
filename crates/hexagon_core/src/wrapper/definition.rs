//! Per-kind wrapper behavior and field assignment strategies.

use crate::model::{Data, ModelKind, Record};
use crate::repo::ModelResult;
use crate::validation::Rules;
use crate::wrapper::naming::model_alias;
use serde_json::Value;

/// Declares how one record kind is validated, filled and patched.
///
/// Implementors are usually unit structs named `<Kind>Wrapper`; the type name
/// drives the default alias.
pub trait WrapperDefinition {
    fn kind(&self) -> &'static ModelKind;

    /// Name under which `Updateable::field` yields the whole record.
    fn alias(&self) -> String {
        model_alias(std::any::type_name::<Self>())
    }

    /// Full rule set. `record` is the persisted record on update paths and
    /// `None` when creating.
    fn validation_rules(&self, record: Option<&Record>) -> Rules;

    /// Fields accepted by `patch`. Empty disables patching.
    fn patchable_fields(&self) -> &[&'static str] {
        &[]
    }

    /// Applies raw input to the record without saving.
    fn set_data(&self, record: &mut Record, data: &Data) -> ModelResult<()>;

    /// Runs after a successful `save_data`.
    fn on_save(&self, record: &Record, data: &Data) -> ModelResult<()> {
        let _ = (record, data);
        Ok(())
    }
}

/// Strategy used by `patch` to write one key/value pair.
pub trait FieldSetter {
    fn apply(&self, value: Value, key: &str, record: &mut Record) -> ModelResult<()>;
}

impl<F> FieldSetter for F
where
    F: Fn(Value, &str, &mut Record) -> ModelResult<()>,
{
    fn apply(&self, value: Value, key: &str, record: &mut Record) -> ModelResult<()> {
        self(value, key, record)
    }
}

/// Default setter: direct assignment of `key`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssignField;

impl FieldSetter for AssignField {
    fn apply(&self, value: Value, key: &str, record: &mut Record) -> ModelResult<()> {
        record.set(key, value)
    }
}

/// Assigns `attribute` from `data[key_in_data]` (defaults to `attribute`)
/// only when that key is present.
pub fn set_optional_field(
    record: &mut Record,
    data: &Data,
    attribute: &str,
    key_in_data: Option<&str>,
) -> ModelResult<()> {
    match data.get(key_in_data.unwrap_or(attribute)) {
        Some(value) => record.set(attribute, value.clone()),
        None => Ok(()),
    }
}
