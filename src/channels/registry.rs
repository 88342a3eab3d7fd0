//! Channel registry: one topic per entity type.

use crate::codec;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::transport::{FrameHandler, Transport};
use crate::types::{StreamKey, WireFormat};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::stream::EventStream;

/// An open topic and the streams bound on it.
struct Topic {
    name: String,
    /// Event names in bind order.
    events: Vec<String>,
    streams: HashMap<String, Arc<EventStream>>,
}

/// Owns the per-entity-type topics and their event streams.
///
/// Construct one per connection and pass it by reference; nothing here
/// is global. After [`disconnect`](Self::disconnect) the registry refuses
/// further subscriptions.
pub struct ChannelRegistry {
    transport: Arc<dyn Transport>,
    config: SyncConfig,
    /// Open topics by entity type.
    topics: RwLock<HashMap<String, Topic>>,
    disconnected: AtomicBool,
}

impl ChannelRegistry {
    pub fn new(transport: Arc<dyn Transport>, config: SyncConfig) -> Self {
        Self {
            transport,
            config,
            topics: RwLock::new(HashMap::new()),
            disconnected: AtomicBool::new(false),
        }
    }

    /// Open the topic for `entity_type` with one stream per event name.
    ///
    /// No-op if the topic is already open: existing streams and their
    /// replay buffers are kept and new event names are not added.
    pub fn subscribe(&self, entity_type: &str, events: &[&str]) -> Result<()> {
        self.ensure_live()?;

        // Transport calls below never re-enter the registry.
        let mut topics = self.topics.write();
        if topics.contains_key(entity_type) {
            tracing::debug!(entity_type, "topic already open");
            return Ok(());
        }

        let topic = self.open(entity_type, events)?;
        topics.insert(entity_type.to_string(), topic);
        Ok(())
    }

    /// Tear down the topic for `entity_type` (if open) and open it again.
    ///
    /// Every stream of the old topic is closed, so its replay buffer and
    /// listeners are gone.
    pub fn resubscribe(&self, entity_type: &str, events: &[&str]) -> Result<()> {
        self.ensure_live()?;

        let mut topics = self.topics.write();
        if let Some(old) = topics.remove(entity_type) {
            self.teardown(&old);
        }

        let topic = self.open(entity_type, events)?;
        tracing::info!(entity_type, topic = %topic.name, "resubscribed");
        topics.insert(entity_type.to_string(), topic);
        Ok(())
    }

    /// Close the topic for `entity_type`. Returns false if none was open.
    pub fn unsubscribe(&self, entity_type: &str) -> bool {
        match self.topics.write().remove(entity_type) {
            Some(topic) => {
                self.teardown(&topic);
                true
            }
            None => false,
        }
    }

    /// Look up the stream for an (entity type, event) pair.
    pub fn get_stream(&self, entity_type: &str, event: &str) -> Result<Arc<EventStream>> {
        self.topics
            .read()
            .get(entity_type)
            .and_then(|topic| topic.streams.get(event))
            .cloned()
            .ok_or_else(|| SyncError::StreamUnbound {
                entity_type: entity_type.to_string(),
                event: event.to_string(),
            })
    }

    /// Close every topic and the transport. Terminal.
    pub fn disconnect(&self) {
        if self.disconnected.swap(true, Ordering::AcqRel) {
            return;
        }

        let topics: Vec<Topic> = self.topics.write().drain().map(|(_, t)| t).collect();
        for topic in &topics {
            self.teardown(topic);
        }
        self.transport.disconnect();
        tracing::info!(closed = topics.len(), "registry disconnected");
    }

    pub fn is_subscribed(&self, entity_type: &str) -> bool {
        self.topics.read().contains_key(entity_type)
    }

    /// Entity types with an open topic, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Event names bound on an entity type's topic, in bind order.
    pub fn event_names(&self, entity_type: &str) -> Option<Vec<String>> {
        self.topics
            .read()
            .get(entity_type)
            .map(|topic| topic.events.clone())
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disconnected() {
            Err(SyncError::Disconnected)
        } else {
            Ok(())
        }
    }

    fn open(&self, entity_type: &str, events: &[&str]) -> Result<Topic> {
        let name = self.config.topic_name(entity_type);
        self.transport.open_topic(&name)?;

        let mut topic = Topic {
            name,
            events: Vec::with_capacity(events.len()),
            streams: HashMap::with_capacity(events.len()),
        };

        for &event in events {
            if topic.streams.contains_key(event) {
                continue;
            }

            let stream = Arc::new(EventStream::new(StreamKey::new(entity_type, event)));
            let handler = frame_handler(Arc::downgrade(&stream), self.config.wire_format);
            if let Err(e) = self.transport.bind(&topic.name, event, handler) {
                self.teardown(&topic);
                return Err(e);
            }

            topic.events.push(event.to_string());
            topic.streams.insert(event.to_string(), stream);
        }

        tracing::debug!(entity_type, topic = %topic.name, events = ?topic.events, "topic opened");
        Ok(topic)
    }

    fn teardown(&self, topic: &Topic) {
        self.transport.close_topic(&topic.name);
        for stream in topic.streams.values() {
            stream.close();
        }
        tracing::debug!(topic = %topic.name, "topic closed");
    }
}

/// Decode each frame and push it into the stream. Undecodable frames are
/// dropped without touching the replay buffer.
fn frame_handler(stream: Weak<EventStream>, format: WireFormat) -> FrameHandler {
    Arc::new(move |bytes: &[u8]| {
        let Some(stream) = stream.upgrade() else {
            return;
        };
        match codec::decode(bytes, format) {
            Ok(value) => stream.deliver(Arc::new(value)),
            Err(e) => {
                tracing::warn!(stream = %stream.key(), error = %e, "dropping undecodable frame");
            }
        }
    })
}
