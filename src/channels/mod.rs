//! Per-entity-type channels over a push transport.
//!
//! This module demultiplexes raw topic frames into event streams:
//! - One topic per entity type, opened lazily and memoized
//! - One [`EventStream`] per bound event name on that topic
//! - Latest-value replay (buffer depth 1) for late listeners
//!
//! `resubscribe` and `disconnect` are the only cancellation points. Both
//! close the affected streams, which drops their listeners and replay
//! buffers.
//!
//! # Example
//!
//! ```ignore
//! let registry = ChannelRegistry::new(transport, SyncConfig::default());
//! registry.resubscribe("role", &["created", "updated", "deleted"])?;
//!
//! let stream = registry.get_stream("role", "created")?;
//! stream.attach_fn(|message| println!("role created: {}", message));
//! ```

mod registry;
mod stream;

pub use registry::ChannelRegistry;
pub use stream::{EventStream, Listener};
