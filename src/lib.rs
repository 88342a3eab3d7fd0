//! # Entity Sync
//!
//! Real-time entity synchronization over a push-messaging connection.
//! Server-pushed created/updated/deleted events are demultiplexed onto
//! per-entity-type channels and merged into live collections.
//!
//! ## Core Concepts
//!
//! - **Topics**: One per entity type, opened lazily and memoized
//! - **Event Streams**: One per (entity type, event), with latest-value replay
//! - **Reconciliation**: Idempotent merge rules writing copy-on-write snapshots
//! - **Notifications**: Fire-and-forget messages for successful transitions
//!
//! ## Example
//!
//! ```ignore
//! use entity_sync::{Credentials, EntitySync, LoopbackTransport, SyncConfig, TracingSink};
//!
//! let transport = Arc::new(LoopbackTransport::new());
//! let sync = EntitySync::new(transport.clone(), Arc::new(TracingSink), SyncConfig::default());
//! sync.connect(&Credentials::bearer(token))?;
//!
//! // Component initialization
//! let roles = sync.live_collection("role", &["created", "updated", "deleted"], "role_id", page)?;
//!
//! // Event loop turn
//! transport.pump();
//! println!("{} roles", roles.len());
//! ```

pub mod channels;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod notify;
pub mod reconcile;
pub mod transport;
pub mod types;

// Re-exports
pub use channels::{ChannelRegistry, EventStream, Listener};
pub use client::EntitySync;
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use notify::{ChannelSink, Notification, NotificationSink, NotifyLevel, NullSink, TracingSink};
pub use reconcile::{
    Collection, EntityShape, FieldShape, NoChange, NotifyPolicy, Reconciled, ReconciliationBinder,
    Snapshot, Targets,
};
pub use transport::{ConnectionState, FrameHandler, LoopbackTransport, Transport};
pub use types::*;
