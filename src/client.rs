//! Subscription API tying the registry and binder together.

use crate::channels::ChannelRegistry;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::notify::NotificationSink;
use crate::reconcile::{
    Collection, EntityShape, FieldShape, NotifyPolicy, ReconciliationBinder, Targets,
};
use crate::transport::{ConnectionState, Transport};
use crate::types::{Credentials, Record};
use std::sync::Arc;

/// Entry point for UI components.
///
/// Owns one registry over one transport connection and one binder over
/// that registry.
pub struct EntitySync {
    transport: Arc<dyn Transport>,
    registry: Arc<ChannelRegistry>,
    binder: ReconciliationBinder,
}

impl EntitySync {
    pub fn new(
        transport: Arc<dyn Transport>,
        sink: Arc<dyn NotificationSink>,
        config: SyncConfig,
    ) -> Self {
        let policy = NotifyPolicy {
            enabled: config.notify,
            duration: config.notification_duration(),
        };
        let registry = Arc::new(ChannelRegistry::new(Arc::clone(&transport), config));
        let binder = ReconciliationBinder::with_policy(Arc::clone(&registry), sink, policy);

        Self {
            transport,
            registry,
            binder,
        }
    }

    /// Open the transport connection.
    pub fn connect(&self, credentials: &Credentials) -> Result<()> {
        self.transport.connect(credentials)?;
        tracing::info!("transport connected");
        Ok(())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Open the entity type's topic unless it is already open.
    pub fn subscribe_to_channel(&self, entity_type: &str, events: &[&str]) -> Result<()> {
        self.registry.subscribe(entity_type, events)
    }

    /// Reopen the entity type's topic with fresh streams.
    ///
    /// The old streams take their listeners with them, so the binder's
    /// latch for the entity type is released as well; the next
    /// `setup_listeners` call binds again. The latch is released even when
    /// reopening fails, since the old topic is gone either way.
    pub fn resubscribe(&self, entity_type: &str, events: &[&str]) -> Result<()> {
        let result = self.registry.resubscribe(entity_type, events);
        self.binder.unbind(entity_type);
        result
    }

    /// Bind schema-free records keyed by `id_field` to the three targets.
    pub fn setup_listeners(
        &self,
        entity_type: &str,
        events: &[&str],
        id_field: &str,
        created: &Collection<Record>,
        updated: &Collection<Record>,
        deleted: &Collection<Record>,
    ) -> Result<bool> {
        let shape = FieldShape::new(id_field).with_unwrap(self.registry.config().unwrap_entity);
        let targets = Targets {
            created: created.clone(),
            updated: updated.clone(),
            deleted: deleted.clone(),
        };
        self.binder.bind(entity_type, events, shape, targets)
    }

    /// Bind with a caller-supplied shape.
    pub fn setup_listeners_with<S: EntityShape>(
        &self,
        entity_type: &str,
        events: &[&str],
        shape: S,
        targets: Targets<S::Item>,
    ) -> Result<bool> {
        self.binder.bind(entity_type, events, shape, targets)
    }

    /// Resubscribe and bind a new collection seeded with `initial`.
    pub fn live_collection(
        &self,
        entity_type: &str,
        events: &[&str],
        id_field: &str,
        initial: Vec<Record>,
    ) -> Result<Collection<Record>> {
        self.resubscribe(entity_type, events)?;
        let collection = Collection::from_vec(initial);
        self.setup_listeners(entity_type, events, id_field, &collection, &collection, &collection)?;
        Ok(collection)
    }

    pub fn unbind(&self, entity_type: &str) -> bool {
        self.binder.unbind(entity_type)
    }

    /// Close every topic and the connection. Terminal.
    pub fn disconnect(&self) {
        self.registry.disconnect();
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    pub fn binder(&self) -> &ReconciliationBinder {
        &self.binder
    }
}
