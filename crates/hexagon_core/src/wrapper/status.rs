//! Wrappers for records carrying a status column.
//!
//! # Responsibility
//! - Assign and persist declared statuses.
//! - Broadcast and notify after a status change was saved.
//!
//! # Invariants
//! - Status dirtiness is captured before the store clears it on save.
//! - Notifications fire only after a successful save of a changed status.
//! - `without_status_events` cannot be undone for the instance.

use crate::events::{Broadcaster, EventDispatcher, StatusChanged};
use crate::model::{Record, RecordKey};
use crate::repo::{ModelError, ModelResult, RecordStore};
use crate::wrapper::definition::{FieldSetter, WrapperDefinition};
use crate::wrapper::model_wrapper::{write_json, ModelWrapper, Updateable, WrapperParts};
use log::debug;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};

/// Channel and broadcast name registered for one status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBroadcast {
    pub channel: String,
    pub name: String,
}

impl StatusBroadcast {
    pub fn new(channel: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            name: name.into(),
        }
    }
}

/// Wrapper definition for kinds with a status state machine.
///
/// Transition legality is owned by the definition; the default accepts any
/// declared status from any other.
pub trait StatusDefinition: WrapperDefinition {
    fn status_field(&self) -> &'static str {
        "status"
    }

    /// Every status the kind may hold.
    fn statuses(&self) -> &[&'static str];

    fn can_transition(&self, from: Option<&str>, to: &str) -> bool {
        let _ = (from, to);
        true
    }

    /// Status -> event name carried on `StatusChanged`.
    fn registered_status_events(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::new()
    }

    /// Status -> broadcast published after the change is saved.
    fn registered_status_broadcasts(&self) -> BTreeMap<&'static str, StatusBroadcast> {
        BTreeMap::new()
    }

    fn broadcast_channels(&self, record: &Record, broadcast: &StatusBroadcast) -> Vec<String> {
        let _ = record;
        vec![broadcast.channel.clone()]
    }

    fn broadcast_data(&self, record: &Record) -> Value {
        json!({
            "kind": record.kind().name,
            "key": record.key(),
            "status": record.get(self.status_field()).cloned().unwrap_or(Value::Null),
        })
    }
}

/// Event collaborators handed to status wrappers.
#[derive(Clone, Copy)]
pub struct StatusEvents<'s> {
    pub dispatcher: &'s dyn EventDispatcher,
    pub broadcaster: &'s dyn Broadcaster,
}

impl<'s> StatusEvents<'s> {
    pub fn new(dispatcher: &'s dyn EventDispatcher, broadcaster: &'s dyn Broadcaster) -> Self {
        Self {
            dispatcher,
            broadcaster,
        }
    }

    /// Uses one sink for both notifications and broadcasts.
    pub fn from_sink<T: EventDispatcher + Broadcaster>(sink: &'s T) -> Self {
        Self::new(sink, sink)
    }
}

/// Wrapper that adds status transitions on top of `ModelWrapper`.
pub struct StatusWrapper<'s, D> {
    inner: ModelWrapper<'s, D>,
    events: StatusEvents<'s>,
    dispatch_status_events: bool,
}

impl<'s, D: StatusDefinition> StatusWrapper<'s, D> {
    pub fn new(
        store: &'s dyn RecordStore,
        definition: D,
        record: Record,
        events: StatusEvents<'s>,
    ) -> ModelResult<Self> {
        Ok(Self {
            inner: ModelWrapper::new(store, definition, record)?,
            events,
            dispatch_status_events: true,
        })
    }

    pub fn set_field_setter(&mut self, setter: impl FieldSetter + 's) -> &mut Self {
        self.inner.set_field_setter(setter);
        self
    }

    /// Current in-memory status.
    pub fn status(&self) -> Option<&str> {
        self.inner
            .model()
            .get(self.inner.definition().status_field())
            .and_then(Value::as_str)
    }

    /// Assigns `status` in memory without saving.
    ///
    /// # Errors
    /// - `UnknownStatus` when `status` is not declared.
    /// - `IllegalTransition` when the definition refuses the move.
    pub fn set_status(&mut self, status: &str) -> ModelResult<&mut Self> {
        let definition = self.inner.definition();
        let kind = definition.kind().name;

        if !definition.statuses().iter().any(|declared| *declared == status) {
            return Err(ModelError::UnknownStatus {
                kind,
                status: status.to_string(),
            });
        }

        let current = self.status();
        if current != Some(status) && !definition.can_transition(current, status) {
            return Err(ModelError::IllegalTransition {
                kind,
                from: current.map(str::to_string),
                to: status.to_string(),
            });
        }

        let WrapperParts {
            definition, record, ..
        } = self.inner.split_mut();
        record.set(definition.status_field(), status)?;
        Ok(self)
    }

    /// `set_status` followed by `save`.
    pub fn update_status(&mut self, status: &str) -> ModelResult<bool> {
        self.set_status(status)?;
        self.save()
    }

    pub fn status_is(&self, status: &str) -> bool {
        self.status() == Some(status)
    }

    /// Whether the status differs from the persisted value.
    pub fn has_status_changed(&self) -> bool {
        self.inner
            .model()
            .is_dirty(self.inner.definition().status_field())
    }

    pub fn registered_status_events(&self) -> BTreeMap<&'static str, &'static str> {
        self.inner.definition().registered_status_events()
    }

    pub fn registered_status_broadcasts(&self) -> BTreeMap<&'static str, StatusBroadcast> {
        self.inner.definition().registered_status_broadcasts()
    }

    /// Publishes the current status' registered broadcast, if any.
    pub fn broadcast(&self) {
        let Some(status) = self.status() else {
            return;
        };
        let definition = self.inner.definition();
        let broadcasts = definition.registered_status_broadcasts();
        let Some(broadcast) = broadcasts.get(status) else {
            return;
        };

        let record = self.inner.model();
        let channels = definition.broadcast_channels(record, broadcast);
        let payload = definition.broadcast_data(record);
        self.events
            .broadcaster
            .publish(&channels, &broadcast.name, &payload);
    }

    /// Stops broadcasts and notifications for the rest of this wrapper's life.
    pub fn without_status_events(&mut self) -> &mut Self {
        self.dispatch_status_events = false;
        self
    }

    pub fn dispatches_status_events(&self) -> bool {
        self.dispatch_status_events
    }

    fn notify_status_changed(&self, key: Option<RecordKey>, previous: Option<String>) {
        let Some(status) = self.status() else {
            return;
        };
        let event = self
            .registered_status_events()
            .get(status)
            .map(|name| name.to_string());

        self.broadcast();
        self.events.dispatcher.dispatch(&StatusChanged {
            kind: self.inner.definition().kind().name,
            key,
            previous,
            status: status.to_string(),
            event,
        });
    }
}

impl<D: StatusDefinition> Updateable for StatusWrapper<'_, D> {
    type Definition = D;

    fn definition(&self) -> &D {
        self.inner.definition()
    }

    fn model(&self) -> &Record {
        self.inner.model()
    }

    fn split_mut(&mut self) -> WrapperParts<'_, D> {
        self.inner.split_mut()
    }

    fn replace_model(&mut self, record: Record) -> ModelResult<()> {
        self.inner.replace_model(record)
    }

    fn save(&mut self) -> ModelResult<bool> {
        let status_changed = self.has_status_changed();
        let previous = self
            .inner
            .model()
            .original(self.inner.definition().status_field())
            .and_then(Value::as_str)
            .map(str::to_string);

        let saved = self.inner.save()?;

        if saved && status_changed {
            if self.dispatch_status_events {
                self.notify_status_changed(self.model().key(), previous);
            } else {
                debug!(
                    "event=status_changed module=wrapper status=suppressed kind={}",
                    self.inner.definition().kind().name
                );
            }
        }
        Ok(saved)
    }

    fn delete(&mut self) -> ModelResult<bool> {
        self.inner.delete()
    }

    fn into_model(self) -> Record {
        self.inner.into_model()
    }
}

impl<D> Serialize for StatusWrapper<'_, D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.serialize(serializer)
    }
}

impl<D> Display for StatusWrapper<'_, D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write_json(f, self.inner.record_ref())
    }
}

impl<D> Debug for StatusWrapper<'_, D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusWrapper")
            .field("record", self.inner.record_ref())
            .field("dispatch_status_events", &self.dispatch_status_events)
            .finish_non_exhaustive()
    }
}
