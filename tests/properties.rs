//! Property tests for reconciliation under arbitrary delivery sequences.

use crossbeam_channel::Receiver;
use entity_sync::{
    ChannelRegistry, ChannelSink, Collection, Credentials, EventKind, FieldShape,
    LoopbackTransport, Notification, Record, ReconciliationBinder, SyncConfig, Targets, Transport,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

const EVENTS: &[&str] = &["created", "updated", "deleted"];

struct Bound {
    registry: Arc<ChannelRegistry>,
    _binder: ReconciliationBinder,
    items: Collection<Record>,
    notes: Receiver<Notification>,
}

fn bound() -> Bound {
    let transport = Arc::new(LoopbackTransport::new());
    transport.connect(&Credentials::bearer("t")).unwrap();
    let registry = Arc::new(ChannelRegistry::new(transport, SyncConfig::default()));
    registry.resubscribe("item", EVENTS).unwrap();
    let (sink, notes) = ChannelSink::new();
    let binder = ReconciliationBinder::new(Arc::clone(&registry), Arc::new(sink));
    let items = Collection::new();
    binder
        .bind("item", EVENTS, FieldShape::new("id"), Targets::shared(&items))
        .unwrap();
    Bound {
        registry,
        _binder: binder,
        items,
        notes,
    }
}

fn send(b: &Bound, kind: EventKind, message: &Value) {
    b.registry
        .get_stream("item", kind.as_str())
        .unwrap()
        .deliver(Arc::new(message.clone()));
}

fn op() -> impl Strategy<Value = (EventKind, Value)> {
    let kind = prop_oneof![
        Just(EventKind::Created),
        Just(EventKind::Updated),
        Just(EventKind::Deleted),
    ];
    (kind, 0u8..5, 0u8..3).prop_map(|(kind, id, v)| {
        let message = match kind {
            EventKind::Deleted => json!({"id": id}),
            _ => json!({"id": id, "v": v}),
        };
        (kind, message)
    })
}

fn keys(items: &Collection<Record>) -> Vec<Value> {
    items
        .to_vec()
        .iter()
        .filter_map(|r| r.get("id").cloned())
        .collect()
}

proptest! {
    #[test]
    fn ids_stay_unique(ops in prop::collection::vec(op(), 0..60)) {
        let b = bound();
        for (kind, message) in &ops {
            send(&b, *kind, message);
            let ids = keys(&b.items);
            let unique: HashSet<String> = ids.iter().map(Value::to_string).collect();
            prop_assert_eq!(unique.len(), ids.len());
        }
    }

    #[test]
    fn duplicate_delivery_converges(ops in prop::collection::vec(op(), 0..40)) {
        let once = bound();
        let twice = bound();
        for (kind, message) in &ops {
            send(&once, *kind, message);
            send(&twice, *kind, message);
            send(&twice, *kind, message);
        }
        prop_assert_eq!(once.items.to_vec(), twice.items.to_vec());

        // Updates here carry the whole record, so a repeat is a no-op and
        // must not notify or bump the version.
        prop_assert_eq!(once.notes.try_iter().count(), twice.notes.try_iter().count());
        prop_assert_eq!(once.items.version(), twice.items.version());
    }

    #[test]
    fn creates_come_out_most_recent_first(ids in prop::collection::hash_set(0u32..1000, 0..30)) {
        let b = bound();
        let ids: Vec<u32> = ids.into_iter().collect();
        for id in &ids {
            send(&b, EventKind::Created, &json!({"id": id}));
        }
        let expected: Vec<Value> = ids.iter().rev().map(|id| json!(id)).collect();
        prop_assert_eq!(keys(&b.items), expected);
    }
}
