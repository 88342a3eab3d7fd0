//! Binds event streams to live collections.

use crate::channels::{ChannelRegistry, EventStream};
use crate::error::Result;
use crate::notify::{entity_label, NotificationSink, NotifyLevel};
use crate::types::{EventKind, Message};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::collection::Collection;
use super::rules::{apply_created, apply_deleted, apply_updated, NoChange};
use super::shape::EntityShape;

/// The collections a binding writes to. Any of them may be the same
/// collection.
pub struct Targets<T> {
    /// Receives create-driven growth.
    pub created: Collection<T>,
    /// Receives update-driven mutation.
    pub updated: Collection<T>,
    /// Receives delete-driven shrinkage.
    pub deleted: Collection<T>,
}

impl<T> Targets<T> {
    /// All three rules write to one collection.
    pub fn shared(collection: &Collection<T>) -> Self {
        Self {
            created: collection.clone(),
            updated: collection.clone(),
            deleted: collection.clone(),
        }
    }
}

impl<T> Clone for Targets<T> {
    fn clone(&self) -> Self {
        Self {
            created: self.created.clone(),
            updated: self.updated.clone(),
            deleted: self.deleted.clone(),
        }
    }
}

/// Notification settings for bindings.
#[derive(Clone, Debug)]
pub struct NotifyPolicy {
    pub enabled: bool,
    pub duration: Option<Duration>,
}

impl Default for NotifyPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            duration: Some(Duration::from_millis(3000)),
        }
    }
}

/// One entity type's reconciliation state, shared by its listeners.
struct Reconciler<S: EntityShape> {
    entity_type: String,
    label: String,
    shape: S,
    targets: Targets<S::Item>,
    sink: Arc<dyn NotificationSink>,
    policy: NotifyPolicy,
    active: Arc<AtomicBool>,
}

impl<S: EntityShape> Reconciler<S> {
    fn handle(&self, kind: EventKind, message: &Message) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }

        let changed = match kind {
            EventKind::Created => self.on_created(message),
            EventKind::Updated => self.on_updated(message),
            EventKind::Deleted => self.on_deleted(message),
        };

        if changed && self.policy.enabled {
            self.sink.notify(
                &format!("{} {}", self.label, kind),
                NotifyLevel::Info,
                self.policy.duration,
            );
        }
    }

    fn on_created(&self, message: &Message) -> bool {
        let Some(item) = self.shape.extract(&self.entity_type, message) else {
            tracing::warn!(entity_type = %self.entity_type, "created message carries no record");
            return false;
        };

        let shape = &self.shape;
        let result = self
            .targets
            .created
            .apply(|current| apply_created(current, item, |i| shape.key(i)));
        self.settle(EventKind::Created, result.map(|_| ()))
    }

    fn on_updated(&self, message: &Message) -> bool {
        let Some(item) = self.shape.extract(&self.entity_type, message) else {
            tracing::warn!(entity_type = %self.entity_type, "updated message carries no record");
            return false;
        };

        let shape = &self.shape;
        let result = self.targets.updated.apply(|current| {
            apply_updated(current, &item, |i| shape.key(i), |a, b| shape.merge(a, b))
        });

        if matches!(result, Err(NoChange::NotFound)) {
            tracing::warn!(
                entity_type = %self.entity_type,
                key = ?self.shape.key(&item),
                "update references a record missing from the collection"
            );
            return false;
        }
        self.settle(EventKind::Updated, result.map(|_| ()))
    }

    fn on_deleted(&self, message: &Message) -> bool {
        let Some(id) = self.shape.key_of_message(&self.entity_type, message) else {
            tracing::warn!(entity_type = %self.entity_type, "deleted message carries no id");
            return false;
        };

        let shape = &self.shape;
        let result = self
            .targets
            .deleted
            .apply(|current| apply_deleted(current, &id, |i| shape.key(i)));
        self.settle(EventKind::Deleted, result.map(|_| ()))
    }

    /// Log absorbed no-ops; true if the collection changed.
    fn settle(&self, kind: EventKind, result: std::result::Result<(), NoChange>) -> bool {
        match result {
            Ok(()) => true,
            Err(NoChange::MissingKey) => {
                tracing::warn!(entity_type = %self.entity_type, %kind, "record has no id");
                false
            }
            Err(reason) => {
                tracing::debug!(entity_type = %self.entity_type, %kind, ?reason, "absorbed duplicate");
                false
            }
        }
    }
}

/// Attaches reconciliation listeners to a registry's streams.
///
/// Each entity type is bound at most once per binder; repeated `bind`
/// calls for the same type are ignored until it is unbound.
pub struct ReconciliationBinder {
    registry: Arc<ChannelRegistry>,
    sink: Arc<dyn NotificationSink>,
    policy: NotifyPolicy,
    /// Bound entity types and the flag that keeps their listeners live.
    bound: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl ReconciliationBinder {
    pub fn new(registry: Arc<ChannelRegistry>, sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_policy(registry, sink, NotifyPolicy::default())
    }

    pub fn with_policy(
        registry: Arc<ChannelRegistry>,
        sink: Arc<dyn NotificationSink>,
        policy: NotifyPolicy,
    ) -> Self {
        Self {
            registry,
            sink,
            policy,
            bound: Mutex::new(HashMap::new()),
        }
    }

    /// Bind `events` of `entity_type` to `targets`.
    ///
    /// Returns `Ok(false)` if the entity type is already bound. Every
    /// named stream must exist, otherwise nothing is attached and
    /// `StreamUnbound` is returned. Event names that select no rule are
    /// skipped.
    pub fn bind<S: EntityShape>(
        &self,
        entity_type: &str,
        events: &[&str],
        shape: S,
        targets: Targets<S::Item>,
    ) -> Result<bool> {
        let mut bound = self.bound.lock();
        if bound.contains_key(entity_type) {
            tracing::debug!(entity_type, "already bound");
            return Ok(false);
        }

        let mut streams: Vec<(EventKind, Arc<EventStream>)> = Vec::with_capacity(events.len());
        for &event in events {
            let Some(kind) = EventKind::classify(event) else {
                tracing::warn!(entity_type, event, "event name selects no reconciliation rule");
                continue;
            };
            streams.push((kind, self.registry.get_stream(entity_type, event)?));
        }

        let active = Arc::new(AtomicBool::new(true));
        bound.insert(entity_type.to_string(), Arc::clone(&active));
        drop(bound);

        let reconciler = Arc::new(Reconciler {
            entity_type: entity_type.to_string(),
            label: entity_label(entity_type),
            shape,
            targets,
            sink: Arc::clone(&self.sink),
            policy: self.policy.clone(),
            active,
        });

        // Attaching may replay a buffered message right away.
        for (kind, stream) in streams {
            let reconciler = Arc::clone(&reconciler);
            stream.attach_fn(move |message| reconciler.handle(kind, message));
        }

        tracing::debug!(entity_type, "bound");
        Ok(true)
    }

    /// Deactivate an entity type's listeners and release its latch so it
    /// can be bound again. The inert listeners are dropped with their
    /// streams on the next resubscribe.
    pub fn unbind(&self, entity_type: &str) -> bool {
        match self.bound.lock().remove(entity_type) {
            Some(active) => {
                active.store(false, Ordering::Release);
                tracing::debug!(entity_type, "unbound");
                true
            }
            None => false,
        }
    }

    pub fn is_bound(&self, entity_type: &str) -> bool {
        self.bound.lock().contains_key(entity_type)
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::notify::{ChannelSink, Notification};
    use crate::reconcile::FieldShape;
    use crate::transport::{LoopbackTransport, Transport};
    use crate::types::{Credentials, Record};
    use crossbeam_channel::Receiver;
    use serde_json::{json, Value};

    const EVENTS: &[&str] = &["created", "updated", "deleted"];

    struct Harness {
        registry: Arc<ChannelRegistry>,
        binder: ReconciliationBinder,
        notes: Receiver<Notification>,
    }

    fn harness() -> Harness {
        let transport = Arc::new(LoopbackTransport::new());
        transport.connect(&Credentials::bearer("token")).unwrap();
        let registry = Arc::new(ChannelRegistry::new(transport, SyncConfig::default()));
        registry.resubscribe("role", EVENTS).unwrap();
        let (sink, notes) = ChannelSink::new();
        let binder = ReconciliationBinder::new(Arc::clone(&registry), Arc::new(sink));
        Harness {
            registry,
            binder,
            notes,
        }
    }

    fn deliver(h: &Harness, event: &str, value: Value) {
        h.registry
            .get_stream("role", event)
            .unwrap()
            .deliver(Arc::new(value));
    }

    fn values(collection: &Collection<Record>) -> Vec<Value> {
        collection.to_vec().into_iter().map(Record::into_value).collect()
    }

    #[test]
    fn test_bind_latch() {
        let h = harness();
        let roles = Collection::new();
        assert!(h
            .binder
            .bind("role", EVENTS, FieldShape::new("role_id"), Targets::shared(&roles))
            .unwrap());
        assert!(!h
            .binder
            .bind("role", EVENTS, FieldShape::new("role_id"), Targets::shared(&roles))
            .unwrap());

        deliver(&h, "created", json!({"role_id": 1}));
        assert_eq!(roles.len(), 1);
        assert_eq!(h.notes.try_iter().count(), 1);
        assert_eq!(h.registry.get_stream("role", "created").unwrap().listener_count(), 1);
    }

    #[test]
    fn test_bind_unbound_stream_attaches_nothing() {
        let h = harness();
        let users: Collection<Record> = Collection::new();
        let result = h.binder.bind(
            "user",
            EVENTS,
            FieldShape::new("user_id"),
            Targets::shared(&users),
        );
        assert!(result.is_err());
        assert!(!h.binder.is_bound("user"));
    }

    #[test]
    fn test_separate_targets() {
        let h = harness();
        let created = Collection::new();
        let updated = Collection::from_vec(vec![Record::new().with("role_id", 5).with("name", "old")]);
        let deleted = Collection::from_vec(vec![Record::new().with("role_id", 9)]);

        h.binder
            .bind(
                "role",
                EVENTS,
                FieldShape::new("role_id"),
                Targets {
                    created: created.clone(),
                    updated: updated.clone(),
                    deleted: deleted.clone(),
                },
            )
            .unwrap();

        deliver(&h, "created", json!({"role_id": 1}));
        deliver(&h, "updated", json!({"role_id": 5, "name": "new"}));
        deliver(&h, "deleted", json!({"role_id": 9}));

        assert_eq!(values(&created), vec![json!({"role_id": 1})]);
        assert_eq!(values(&updated), vec![json!({"role_id": 5, "name": "new"})]);
        assert!(deleted.is_empty());
    }

    #[test]
    fn test_update_for_unknown_record_is_silent() {
        let h = harness();
        let roles = Collection::new();
        h.binder
            .bind("role", EVENTS, FieldShape::new("role_id"), Targets::shared(&roles))
            .unwrap();

        deliver(&h, "updated", json!({"role_id": 42, "name": "ghost"}));
        assert!(roles.is_empty());
        assert_eq!(roles.version(), 0);
        assert!(h.notes.try_recv().is_err());
    }

    #[test]
    fn test_bind_replays_buffered_message() {
        let h = harness();
        deliver(&h, "created", json!({"role": {"role_id": 3, "name": "Early"}}));

        let roles = Collection::new();
        h.binder
            .bind("role", EVENTS, FieldShape::new("role_id"), Targets::shared(&roles))
            .unwrap();
        assert_eq!(values(&roles), vec![json!({"role_id": 3, "name": "Early"})]);
    }

    #[test]
    fn test_unbind_silences_listeners() {
        let h = harness();
        let first = Collection::new();
        h.binder
            .bind("role", EVENTS, FieldShape::new("role_id"), Targets::shared(&first))
            .unwrap();
        assert!(h.binder.unbind("role"));
        assert!(!h.binder.unbind("role"));

        let second = Collection::new();
        assert!(h
            .binder
            .bind("role", EVENTS, FieldShape::new("role_id"), Targets::shared(&second))
            .unwrap());

        // Binding the second collection replayed nothing, since no
        // message had been delivered yet.
        deliver(&h, "created", json!({"role_id": 1}));
        assert!(first.is_empty());
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_notifications_disabled() {
        let transport = Arc::new(LoopbackTransport::new());
        transport.connect(&Credentials::bearer("token")).unwrap();
        let registry = Arc::new(ChannelRegistry::new(transport.clone(), SyncConfig::default()));
        registry.subscribe("role", EVENTS).unwrap();
        let (sink, notes) = ChannelSink::new();
        let binder = ReconciliationBinder::with_policy(
            Arc::clone(&registry),
            Arc::new(sink),
            NotifyPolicy {
                enabled: false,
                duration: None,
            },
        );

        let roles = Collection::new();
        binder
            .bind("role", EVENTS, FieldShape::new("role_id"), Targets::shared(&roles))
            .unwrap();
        transport.publish("role-channel", "created", br#"{"role_id": 1}"#.to_vec());
        transport.pump();

        assert_eq!(roles.len(), 1);
        assert!(notes.try_recv().is_err());
        assert_eq!(transport.state(), crate::transport::ConnectionState::Connected);
    }
}
