//! Core types for the synchronization layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A decoded push message, shared between a stream's replay buffer and
/// its listeners.
pub type Message = Arc<Value>;

/// A schema-free entity record: field name to value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value. Returns None unless the value is an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(|fields| Self(fields.clone()))
    }

    /// Look up a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a field, returning the record for chaining.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Shallow merge: every field of `incoming` overwrites ours, fields
    /// only we carry are kept.
    pub fn merged(&self, incoming: &Record) -> Record {
        let mut fields = self.0.clone();
        for (key, value) in &incoming.0 {
            fields.insert(key.clone(), value.clone());
        }
        Record(fields)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Which reconciliation rule an event name selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

impl EventKind {
    /// Classify an event name by its suffix, ignoring case.
    ///
    /// `"created"`, `"RoleCreated"` and `"role.created"` are all `Created`.
    pub fn classify(event: &str) -> Option<Self> {
        let lower = event.to_ascii_lowercase();
        if lower.ends_with("created") {
            Some(EventKind::Created)
        } else if lower.ends_with("updated") {
            Some(EventKind::Updated)
        } else if lower.ends_with("deleted") {
            Some(EventKind::Deleted)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Updated => "updated",
            EventKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one event stream: (entity type, event name).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub entity_type: String,
    pub event: String,
}

impl StreamKey {
    pub fn new(entity_type: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            event: event.into(),
        }
    }
}

impl fmt::Debug for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamKey({}/{})", self.entity_type, self.event)
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.event)
    }
}

/// Payload encoding used on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    #[default]
    Json,
    MessagePack,
}

/// Bearer credential attached when the transport connects.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub bearer_token: String,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer_token: token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &"<redacted>")
            .finish()
    }
}
