//! Single-buffered fan-out stream for one (entity type, event) pair.

use crate::types::{Message, StreamKey};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Callback attached to an event stream.
pub type Listener = Arc<dyn Fn(&Message) + Send + Sync>;

struct StreamState {
    /// Most recently delivered message (replay buffer, depth 1).
    latest: Option<Message>,
    /// Attached listeners, in attachment order.
    listeners: Vec<Listener>,
    delivered: u64,
}

/// Addressable delivery point with latest-value replay.
///
/// Listeners are invoked outside the internal lock, so a listener may
/// attach further listeners or look up other streams.
pub struct EventStream {
    key: StreamKey,
    state: Mutex<StreamState>,
    closed: AtomicBool,
}

impl EventStream {
    pub(crate) fn new(key: StreamKey) -> Self {
        Self {
            key,
            state: Mutex::new(StreamState {
                latest: None,
                listeners: Vec::new(),
                delivered: 0,
            }),
            closed: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &StreamKey {
        &self.key
    }

    /// Buffer `message` as the latest value and notify every attached
    /// listener in attachment order.
    ///
    /// Ignored once the stream has been closed by a teardown.
    pub fn deliver(&self, message: Message) {
        if self.is_closed() {
            tracing::debug!(stream = %self.key, "delivery on closed stream ignored");
            return;
        }

        let listeners = {
            let mut state = self.state.lock();
            state.latest = Some(Arc::clone(&message));
            state.delivered += 1;
            state.listeners.clone()
        };

        for listener in listeners {
            listener(&message);
        }
    }

    /// Attach a listener. If anything has been delivered already, the
    /// listener is invoked with the latest message before this returns.
    pub fn attach(&self, listener: Listener) {
        if self.is_closed() {
            tracing::debug!(stream = %self.key, "attach on closed stream ignored");
            return;
        }

        let replay = {
            let mut state = self.state.lock();
            state.listeners.push(Arc::clone(&listener));
            state.latest.clone()
        };

        if let Some(message) = replay {
            listener(&message);
        }
    }

    /// Attach a closure as a listener.
    pub fn attach_fn<F>(&self, f: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.attach(Arc::new(f));
    }

    /// The buffered message, if any.
    pub fn latest(&self) -> Option<Message> {
        self.state.lock().latest.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Number of messages delivered over the stream's lifetime.
    pub fn delivered(&self) -> u64 {
        self.state.lock().delivered
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Discard listeners and the replay buffer. Terminal.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let mut state = self.state.lock();
        state.listeners.clear();
        state.latest = None;
    }
}
