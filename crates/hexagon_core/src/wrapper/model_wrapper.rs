//! Record wrappers: the shared write-side contract and its plain implementation.
//!
//! # Responsibility
//! - Validate, fill, patch, save and delete one bound record.
//! - Expose record fields through a documented lookup order.
//!
//! # Invariants
//! - A wrapper's record kind never changes after construction.
//! - `patch` never writes fields outside `patchable_fields`.
//! - `on_save` runs only after a save reported success.

use crate::model::{Data, ModelKind, Record, RecordKey};
use crate::repo::{ModelError, ModelResult, RecordStore};
use crate::validation::validate as check_rules;
use crate::wrapper::definition::{AssignField, FieldSetter, WrapperDefinition};
use crate::wrapper::naming::{to_camel, to_snake};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt::{Debug, Display, Formatter};

/// Mutable view over a wrapper's parts, used by the provided methods.
pub struct WrapperParts<'w, D> {
    pub definition: &'w D,
    pub field_setter: &'w dyn FieldSetter,
    pub record: &'w mut Record,
}

/// Result of a field lookup on a wrapper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    /// The lookup named the wrapper alias.
    Record(&'a Record),
    Value(&'a Value),
}

impl<'a> FieldRef<'a> {
    pub fn as_value(&self) -> Option<&'a Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&'a Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Value(_) => None,
        }
    }
}

/// Storage-friendly handle that re-locates a wrapped record.
///
/// Carries identity only; collaborators are re-injected on restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperIdentity {
    pub kind: String,
    pub key: RecordKey,
}

/// Write-side contract shared by every wrapper.
pub trait Updateable {
    type Definition: WrapperDefinition;

    fn definition(&self) -> &Self::Definition;

    fn model(&self) -> &Record;

    fn split_mut(&mut self) -> WrapperParts<'_, Self::Definition>;

    /// Rebinds to another record of the same kind.
    fn replace_model(&mut self, record: Record) -> ModelResult<()>;

    fn save(&mut self) -> ModelResult<bool>;

    fn delete(&mut self) -> ModelResult<bool>;

    fn into_model(self) -> Record
    where
        Self: Sized;

    /// Checks `data` against the full rule set for `context`.
    fn validate(&self, data: &Data, context: Option<&Record>) -> ModelResult<&Self> {
        check_rules(data, &self.definition().validation_rules(context))?;
        Ok(self)
    }

    /// Validates against the bound record's rules, then `save_data`.
    fn update(&mut self, data: &Data) -> ModelResult<bool> {
        self.validate(data, Some(self.model()))?;
        self.save_data(data)
    }

    /// Partial update restricted to `patchable_fields`.
    ///
    /// Keys outside the allow-list are dropped without error; only the rules
    /// of the remaining keys are checked.
    fn patch(&mut self, data: &Data) -> ModelResult<bool> {
        let patchable = self.definition().patchable_fields();
        let accepted: Data = data
            .iter()
            .filter(|(key, _)| patchable.iter().any(|field| *field == key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let rules = self
            .definition()
            .validation_rules(Some(self.model()))
            .only(accepted.keys().map(String::as_str));
        check_rules(&accepted, &rules)?;

        let WrapperParts {
            field_setter,
            record,
            ..
        } = self.split_mut();
        for (key, value) in accepted {
            field_setter.apply(value, &key, record)?;
        }

        self.save()
    }

    /// Applies `data` through the definition without saving.
    fn set_data(&mut self, data: &Data) -> ModelResult<&mut Self> {
        let WrapperParts {
            definition, record, ..
        } = self.split_mut();
        definition.set_data(record, data)?;
        Ok(self)
    }

    /// `set_data`, `save`, then the definition's `on_save` hook.
    fn save_data(&mut self, data: &Data) -> ModelResult<bool> {
        self.set_data(data)?;
        let saved = self.save()?;
        if saved {
            self.definition().on_save(self.model(), data)?;
        }
        Ok(saved)
    }

    fn alias(&self) -> String {
        self.definition().alias()
    }

    /// Looks `name` up in order: wrapper alias (camel-cased compare), exact
    /// attribute, snake_case attribute.
    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        let record = self.model();
        if to_camel(name) == self.alias() {
            return Some(FieldRef::Record(record));
        }
        record
            .get(name)
            .or_else(|| record.get(&to_snake(name)))
            .map(FieldRef::Value)
    }

    /// Kind and key of the persisted record.
    fn identity(&self) -> ModelResult<WrapperIdentity> {
        let record = self.model();
        match record.key() {
            Some(key) if record.exists() => Ok(WrapperIdentity {
                kind: record.kind().name.to_string(),
                key,
            }),
            _ => Err(ModelError::ContractViolation(format!(
                "unsaved {} has no persisted identity",
                record.kind().name
            ))),
        }
    }
}

/// Plain wrapper: one record, one definition, one store.
pub struct ModelWrapper<'s, D> {
    store: &'s dyn RecordStore,
    definition: D,
    record: Record,
    field_setter: Box<dyn FieldSetter + 's>,
}

impl<'s, D: WrapperDefinition> ModelWrapper<'s, D> {
    /// Binds `record`; it must be of the definition's kind.
    pub fn new(store: &'s dyn RecordStore, definition: D, record: Record) -> ModelResult<Self> {
        ensure_same_kind(definition.kind(), &record)?;
        Ok(Self {
            store,
            definition,
            record,
            field_setter: Box::new(AssignField),
        })
    }

    /// Installs the strategy `patch` uses to write fields.
    pub fn set_field_setter(&mut self, setter: impl FieldSetter + 's) -> &mut Self {
        self.field_setter = Box::new(setter);
        self
    }
}

impl<D: WrapperDefinition> Updateable for ModelWrapper<'_, D> {
    type Definition = D;

    fn definition(&self) -> &D {
        &self.definition
    }

    fn model(&self) -> &Record {
        &self.record
    }

    fn split_mut(&mut self) -> WrapperParts<'_, D> {
        WrapperParts {
            definition: &self.definition,
            field_setter: &*self.field_setter,
            record: &mut self.record,
        }
    }

    fn replace_model(&mut self, record: Record) -> ModelResult<()> {
        ensure_same_kind(self.record.kind(), &record)?;
        self.record = record;
        Ok(())
    }

    fn save(&mut self) -> ModelResult<bool> {
        self.store.save(&mut self.record)
    }

    fn delete(&mut self) -> ModelResult<bool> {
        self.store.delete(&mut self.record)
    }

    fn into_model(self) -> Record {
        self.record
    }
}

impl<D> ModelWrapper<'_, D> {
    pub(crate) fn record_ref(&self) -> &Record {
        &self.record
    }
}

impl<D> Serialize for ModelWrapper<'_, D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}

impl<D> Display for ModelWrapper<'_, D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write_json(f, &self.record)
    }
}

impl<D> Debug for ModelWrapper<'_, D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelWrapper")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

pub(crate) fn write_json(f: &mut Formatter<'_>, record: &Record) -> std::fmt::Result {
    let encoded = serde_json::to_string(record).map_err(|_| std::fmt::Error)?;
    f.write_str(&encoded)
}

pub(crate) fn ensure_same_kind(expected: &ModelKind, record: &Record) -> ModelResult<()> {
    if expected.same_kind(record.kind()) {
        return Ok(());
    }
    Err(ModelError::ContractViolation(format!(
        "wrapper bound to {} cannot hold a {} record",
        expected.name,
        record.kind().name
    )))
}
