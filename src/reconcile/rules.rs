//! Merge rules for created/updated/deleted events.
//!
//! Each rule takes the current snapshot and returns either a complete
//! replacement or the reason nothing changed. Rules never touch the input
//! slice, and every no-op branch makes them idempotent under duplicate
//! delivery.

/// Why a rule left the collection alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoChange {
    /// Created item already in the collection.
    AlreadyPresent,
    /// Updated or deleted key not in the collection.
    NotFound,
    /// Update is deep-equal to the existing item.
    Unchanged,
    /// Incoming item has no key.
    MissingKey,
}

/// Result of applying a rule.
#[derive(Clone, Debug, PartialEq)]
pub enum Reconciled<T> {
    Changed(Vec<T>),
    Unchanged(NoChange),
}

/// Prepend `incoming` unless an item with the same key exists.
pub fn apply_created<T, K, F>(current: &[T], incoming: T, key: F) -> Reconciled<T>
where
    T: Clone,
    K: PartialEq,
    F: Fn(&T) -> Option<K>,
{
    let Some(id) = key(&incoming) else {
        return Reconciled::Unchanged(NoChange::MissingKey);
    };

    if current.iter().any(|item| key(item).as_ref() == Some(&id)) {
        return Reconciled::Unchanged(NoChange::AlreadyPresent);
    }

    let mut next = Vec::with_capacity(current.len() + 1);
    next.push(incoming);
    next.extend_from_slice(current);
    Reconciled::Changed(next)
}

/// Replace the item matching `incoming`'s key with `merge(existing, incoming)`.
///
/// The equality check is between the existing item and `incoming` as
/// received, before merging.
pub fn apply_updated<T, K, F, M>(current: &[T], incoming: &T, key: F, merge: M) -> Reconciled<T>
where
    T: Clone + PartialEq,
    K: PartialEq,
    F: Fn(&T) -> Option<K>,
    M: Fn(&T, &T) -> T,
{
    let Some(id) = key(incoming) else {
        return Reconciled::Unchanged(NoChange::MissingKey);
    };

    let Some(position) = current
        .iter()
        .position(|item| key(item).as_ref() == Some(&id))
    else {
        return Reconciled::Unchanged(NoChange::NotFound);
    };

    let existing = &current[position];
    if existing == incoming {
        return Reconciled::Unchanged(NoChange::Unchanged);
    }

    let mut next = current.to_vec();
    next[position] = merge(existing, incoming);
    Reconciled::Changed(next)
}

/// Drop the item whose key equals `id`, keeping the order of the rest.
pub fn apply_deleted<T, K, F>(current: &[T], id: &K, key: F) -> Reconciled<T>
where
    T: Clone,
    K: PartialEq,
    F: Fn(&T) -> Option<K>,
{
    let Some(position) = current
        .iter()
        .position(|item| key(item).as_ref() == Some(id))
    else {
        return Reconciled::Unchanged(NoChange::NotFound);
    };

    let mut next = Vec::with_capacity(current.len() - 1);
    next.extend_from_slice(&current[..position]);
    next.extend_from_slice(&current[position + 1..]);
    Reconciled::Changed(next)
}
