//! Keyed change-notification callbacks.

use crate::sync::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A watch callback: `(key, container, old, new)`.
pub type WatchFn<R, T> = Arc<dyn Fn(&str, &R, &T, &T) + Send + Sync>;

type WatchTable<R, T> = Arc<HashMap<String, WatchFn<R, T>>>;

/// A table of keyed callbacks attached to a container of type `R`.
///
/// Registration and removal are serialized by the table's own lock, which is
/// independent of any value lock. Notification takes a snapshot of the table
/// and runs callbacks with no lock held, so a callback may add or remove
/// watches. Snapshots are copy-on-write: taking one is a reference count bump.
///
/// Notifications for different transitions are not ordered relative to each
/// other when those transitions happen on different threads.
pub struct Watchable<R: ?Sized, T> {
    watches: Mutex<WatchTable<R, T>>,
}

impl<R: ?Sized, T> Watchable<R, T> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            watches: Mutex::new(Arc::new(HashMap::new())),
        }
    }

    /// Registers `f` under `key`, replacing any callback already registered there.
    pub fn add_watch<F>(&self, key: impl Into<String>, f: F)
    where
        F: Fn(&str, &R, &T, &T) + Send + Sync + 'static,
    {
        let mut watches = self.watches.lock();
        Arc::make_mut(&mut watches).insert(key.into(), Arc::new(f));
    }

    /// Removes the callback under `key`. Returns `true` if one was registered.
    pub fn remove_watch(&self, key: &str) -> bool {
        let mut watches = self.watches.lock();
        if !watches.contains_key(key) {
            return false;
        }
        Arc::make_mut(&mut watches).remove(key).is_some()
    }

    /// Returns `true` if a callback is registered under `key`.
    pub fn has_watch(&self, key: &str) -> bool {
        self.watches.lock().contains_key(key)
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.watches.lock().len()
    }

    /// Returns `true` if no callback is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every registered callback once with `(key, container, old, new)`.
    pub fn notify_watches(&self, container: &R, old: &T, new: &T) {
        let snapshot = Arc::clone(&self.watches.lock());
        for (key, f) in snapshot.iter() {
            f(key, container, old, new);
        }
    }
}

impl<R: ?Sized, T> Default for Watchable<R, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ?Sized, T> fmt::Debug for Watchable<R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let watches = self.watches.lock();
        f.debug_set().entries(watches.keys()).finish()
    }
}
