//! Live, copy-on-write collections.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use super::rules::{NoChange, Reconciled};

/// An immutable view of a collection at one version.
pub struct Snapshot<T> {
    items: Arc<Vec<T>>,
    version: u64,
}

impl<T> Snapshot<T> {
    pub fn version(&self) -> u64 {
        self.version
    }

    /// True if both snapshots share the same storage.
    pub fn ptr_eq(&self, other: &Snapshot<T>) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            version: self.version,
        }
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T: fmt::Debug> fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("version", &self.version)
            .field("items", &self.items)
            .finish()
    }
}

struct Slot<T> {
    current: RwLock<Snapshot<T>>,
    watchers: Mutex<Vec<Sender<Snapshot<T>>>>,
}

/// Shared handle to a live collection.
///
/// Clones point at the same collection. Writers replace the whole
/// snapshot, so readers only ever see complete states.
pub struct Collection<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Collection<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Seed a collection, e.g. with a freshly fetched page.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            slot: Arc::new(Slot {
                current: RwLock::new(Snapshot {
                    items: Arc::new(items),
                    version: 0,
                }),
                watchers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.slot.current.read().clone()
    }

    pub fn len(&self) -> usize {
        self.slot.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn version(&self) -> u64 {
        self.slot.current.read().version
    }

    /// Replace the contents wholesale.
    pub fn replace(&self, items: Vec<T>) -> Snapshot<T> {
        let next = {
            let mut current = self.slot.current.write();
            let next = Snapshot {
                items: Arc::new(items),
                version: current.version + 1,
            };
            *current = next.clone();
            next
        };
        self.publish(&next);
        next
    }

    /// Run a merge rule against the current snapshot and install its
    /// result. The rule runs under the write lock, so concurrent writers
    /// cannot interleave between read and replace.
    pub fn apply<F>(&self, rule: F) -> Result<Snapshot<T>, NoChange>
    where
        F: FnOnce(&[T]) -> Reconciled<T>,
    {
        let next = {
            let mut current = self.slot.current.write();
            match rule(current.items.as_slice()) {
                Reconciled::Changed(items) => {
                    let next = Snapshot {
                        items: Arc::new(items),
                        version: current.version + 1,
                    };
                    *current = next.clone();
                    next
                }
                Reconciled::Unchanged(reason) => return Err(reason),
            }
        };
        self.publish(&next);
        Ok(next)
    }

    /// Feed of every snapshot installed after this call.
    pub fn changes(&self) -> Receiver<Snapshot<T>> {
        let (sender, receiver) = unbounded();
        self.slot.watchers.lock().push(sender);
        receiver
    }

    pub fn ptr_eq(&self, other: &Collection<T>) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    fn publish(&self, snapshot: &Snapshot<T>) {
        // Drop watchers whose receiver is gone.
        self.slot
            .watchers
            .lock()
            .retain(|watcher| watcher.send(snapshot.clone()).is_ok());
    }
}

impl<T: Clone> Collection<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.snapshot().to_vec()
    }
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Collection").field(&self.snapshot()).finish()
    }
}
