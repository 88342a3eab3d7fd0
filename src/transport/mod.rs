//! Push-messaging transport capability.
//!
//! The sync layer never talks to the network directly. It consumes a
//! [`Transport`]: one persistent connection that can open named topics
//! and bind per-event frame handlers on them. Reconnection after a drop
//! is the transport's own business; bindings survive it.
//!
//! [`LoopbackTransport`] is an in-process implementation: frames are
//! published onto a queue and dispatched when the owner pumps it, which
//! stands in for the event loop turn that delivers a network message.

mod loopback;

pub use loopback::LoopbackTransport;

use crate::error::Result;
use crate::types::Credentials;
use std::sync::Arc;

/// Callback invoked with each raw frame delivered for a bound event.
pub type FrameHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Lifecycle of the underlying connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected, or explicitly disconnected.
    Disconnected,
    /// Connection dropped; the transport is retrying.
    Connecting,
    Connected,
}

/// A single push-messaging connection.
pub trait Transport: Send + Sync {
    /// Open the connection, authenticating with a bearer credential.
    fn connect(&self, credentials: &Credentials) -> Result<()>;

    /// Open (subscribe to) a topic.
    fn open_topic(&self, topic: &str) -> Result<()>;

    /// Bind a handler for one event name on an open topic.
    fn bind(&self, topic: &str, event: &str, handler: FrameHandler) -> Result<()>;

    /// Close a topic, dropping every handler bound on it.
    fn close_topic(&self, topic: &str);

    /// Close the connection and every topic.
    fn disconnect(&self);

    fn state(&self) -> ConnectionState;
}
