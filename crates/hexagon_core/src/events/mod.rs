//! Status change notifications and broadcast publishing.
//!
//! # Responsibility
//! - Define the fire-and-forget collaborators status wrappers notify.
//! - Ship a recording sink and a log-backed sink.
//!
//! # Invariants
//! - Sinks never report failure back to the wrapper.

use crate::model::RecordKey;
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;

/// Emitted after a record's status change was persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChanged {
    pub kind: &'static str,
    pub key: Option<RecordKey>,
    pub previous: Option<String>,
    pub status: String,
    /// Event name registered for `status`, if any.
    pub event: Option<String>,
}

/// Receives status change notifications.
pub trait EventDispatcher {
    fn dispatch(&self, event: &StatusChanged);
}

/// Publishes payloads to named channels.
pub trait Broadcaster {
    fn publish(&self, channels: &[String], name: &str, payload: &Value);
}

/// One publish call captured by `RecordingEvents`.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedBroadcast {
    pub channels: Vec<String>,
    pub name: String,
    pub payload: Value,
}

/// In-memory sink that keeps every notification in arrival order.
#[derive(Debug, Default)]
pub struct RecordingEvents {
    events: RefCell<Vec<StatusChanged>>,
    broadcasts: RefCell<Vec<PublishedBroadcast>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusChanged> {
        self.events.borrow().clone()
    }

    pub fn broadcasts(&self) -> Vec<PublishedBroadcast> {
        self.broadcasts.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
        self.broadcasts.borrow_mut().clear();
    }
}

impl EventDispatcher for RecordingEvents {
    fn dispatch(&self, event: &StatusChanged) {
        self.events.borrow_mut().push(event.clone());
    }
}

impl Broadcaster for RecordingEvents {
    fn publish(&self, channels: &[String], name: &str, payload: &Value) {
        self.broadcasts.borrow_mut().push(PublishedBroadcast {
            channels: channels.to_vec(),
            name: name.to_string(),
            payload: payload.clone(),
        });
    }
}

/// Sink that writes notifications to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEvents;

impl EventDispatcher for LogEvents {
    fn dispatch(&self, event: &StatusChanged) {
        info!(
            "event=status_changed module=events status=ok kind={} key={:?} from={} to={} name={}",
            event.kind,
            event.key,
            event.previous.as_deref().unwrap_or("-"),
            event.status,
            event.event.as_deref().unwrap_or("-")
        );
    }
}

impl Broadcaster for LogEvents {
    fn publish(&self, channels: &[String], name: &str, payload: &Value) {
        info!(
            "event=broadcast module=events status=ok name={} channels={} payload_bytes={}",
            name,
            channels.join(","),
            payload.to_string().len()
        );
    }
}
