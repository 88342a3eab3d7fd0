//! In-process loopback transport.

use crate::codec;
use crate::error::{Result, SyncError};
use crate::types::{Credentials, WireFormat};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

use super::{ConnectionState, FrameHandler, Transport};

/// A frame waiting to be dispatched.
struct Frame {
    topic: String,
    event: String,
    payload: Vec<u8>,
}

/// Handlers per event name, in bind order.
type TopicBindings = HashMap<String, Vec<FrameHandler>>;

struct Inner {
    state: ConnectionState,
    credentials: Option<Credentials>,
    topics: HashMap<String, TopicBindings>,
    connect_count: u64,
}

/// Transport that loops published frames back to bound handlers.
///
/// `publish` may be called from any thread; dispatch happens on whichever
/// thread calls [`pump`](Self::pump).
pub struct LoopbackTransport {
    inner: RwLock<Inner>,
    sender: Sender<Frame>,
    receiver: Receiver<Frame>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            inner: RwLock::new(Inner {
                state: ConnectionState::Disconnected,
                credentials: None,
                topics: HashMap::new(),
                connect_count: 0,
            }),
            sender,
            receiver,
        }
    }

    /// Queue a frame for dispatch. Returns false if the frame was
    /// discarded because the connection is not up.
    pub fn publish(&self, topic: &str, event: &str, payload: Vec<u8>) -> bool {
        if self.inner.read().state != ConnectionState::Connected {
            tracing::debug!(topic, event, "connection down, frame discarded");
            return false;
        }
        self.sender
            .send(Frame {
                topic: topic.to_string(),
                event: event.to_string(),
                payload,
            })
            .is_ok()
    }

    /// Encode and queue a JSON message.
    pub fn publish_json(
        &self,
        topic: &str,
        event: &str,
        value: &Value,
        format: WireFormat,
    ) -> Result<bool> {
        let payload = codec::encode(value, format)?;
        Ok(self.publish(topic, event, payload))
    }

    /// Dispatch every queued frame, in publish order. Returns the number
    /// of frames dispatched.
    pub fn pump(&self) -> usize {
        let mut dispatched = 0;
        while let Ok(frame) = self.receiver.try_recv() {
            self.dispatch(&frame.topic, &frame.event, &frame.payload);
            dispatched += 1;
        }
        dispatched
    }

    /// Dispatch a frame immediately, bypassing the queue.
    pub fn deliver_now(&self, topic: &str, event: &str, payload: &[u8]) -> bool {
        if self.inner.read().state != ConnectionState::Connected {
            return false;
        }
        self.dispatch(topic, event, payload);
        true
    }

    fn dispatch(&self, topic: &str, event: &str, payload: &[u8]) {
        // Clone handlers out so they can re-enter the transport.
        let handlers: Vec<FrameHandler> = {
            let inner = self.inner.read();
            match inner.topics.get(topic).and_then(|t| t.get(event)) {
                Some(handlers) => handlers.clone(),
                None => {
                    tracing::debug!(topic, event, "no binding for frame");
                    return;
                }
            }
        };

        for handler in handlers {
            handler(payload);
        }
    }

    /// Simulate a network drop. Queued frames are lost.
    pub fn drop_connection(&self) {
        let mut inner = self.inner.write();
        if inner.state == ConnectionState::Connected {
            inner.state = ConnectionState::Connecting;
            while self.receiver.try_recv().is_ok() {}
            tracing::debug!("loopback connection dropped");
        }
    }

    /// Simulate the automatic reconnect that follows a drop. Topic
    /// bindings are kept.
    pub fn reconnect(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.state != ConnectionState::Connecting {
            return false;
        }
        inner.state = ConnectionState::Connected;
        inner.connect_count += 1;
        tracing::debug!("loopback connection restored");
        true
    }

    /// Names of currently open topics, sorted.
    pub fn open_topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().topics.keys().cloned().collect();
        names.sort();
        names
    }

    /// Total handlers bound on a topic across all events.
    pub fn binding_count(&self, topic: &str) -> usize {
        self.inner
            .read()
            .topics
            .get(topic)
            .map(|t| t.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Successful connects, including reconnects.
    pub fn connect_count(&self) -> u64 {
        self.inner.read().connect_count
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.inner.read().credentials.clone()
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LoopbackTransport {
    fn connect(&self, credentials: &Credentials) -> Result<()> {
        if credentials.bearer_token.is_empty() {
            return Err(SyncError::Transport("missing bearer token".to_string()));
        }
        let mut inner = self.inner.write();
        inner.credentials = Some(credentials.clone());
        inner.state = ConnectionState::Connected;
        inner.connect_count += 1;
        Ok(())
    }

    fn open_topic(&self, topic: &str) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.state == ConnectionState::Disconnected {
            return Err(SyncError::NotConnected);
        }
        inner.topics.entry(topic.to_string()).or_default();
        Ok(())
    }

    fn bind(&self, topic: &str, event: &str, handler: FrameHandler) -> Result<()> {
        let mut inner = self.inner.write();
        let bindings = inner
            .topics
            .get_mut(topic)
            .ok_or_else(|| SyncError::TopicNotFound(topic.to_string()))?;
        bindings.entry(event.to_string()).or_default().push(handler);
        Ok(())
    }

    fn close_topic(&self, topic: &str) {
        self.inner.write().topics.remove(topic);
    }

    fn disconnect(&self) {
        let mut inner = self.inner.write();
        inner.topics.clear();
        inner.state = ConnectionState::Disconnected;
        while self.receiver.try_recv().is_ok() {}
    }

    fn state(&self) -> ConnectionState {
        self.inner.read().state
    }
}
