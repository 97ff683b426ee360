use super::numeric::Numeric;
use crate::sync::ReadersWriterLock;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem;

/// A value cell with atomic `get`/`set`/`get_and_set`/`compare_and_set`.
///
/// Reads take the lock in shared mode and writes take it exclusively, so a
/// reader never observes a partially written value. Comparison is by value
/// (`PartialEq`), not identity. The cell performs no notification; that is an
/// [`Atom`](crate::Atom) concern.
///
/// # Example
///
/// ```rust
/// use atomos::{AtomicInteger, AtomicReference};
///
/// let cell = AtomicReference::new(0);
/// assert!(cell.compare_and_set(&0, 1));
/// assert!(!cell.compare_and_set(&0, 2));
/// assert_eq!(cell.get(), 1);
///
/// let counter = AtomicInteger::default();
/// assert_eq!(counter.add_and_get(5), 5);
/// assert_eq!(counter.get(), 5);
/// ```
pub struct AtomicReference<T> {
    lock: ReadersWriterLock,
    value: UnsafeCell<T>,
}

// Safety: the value is only read under shared acquisition and only written
// under exclusive acquisition.
unsafe impl<T: Send> Send for AtomicReference<T> {}
unsafe impl<T: Send + Sync> Sync for AtomicReference<T> {}

impl<T> AtomicReference<T> {
    /// Creates a cell holding `value`.
    pub const fn new(value: T) -> Self {
        Self {
            lock: ReadersWriterLock::new(),
            value: UnsafeCell::new(value),
        }
    }

    /// Consumes the cell, returning the value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    /// Returns a mutable reference without locking.
    ///
    /// This is safe because `&mut self` guarantees exclusive access.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// Runs `f` on the current value under shared acquisition.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let _guard = self.lock.read();
        f(unsafe { &*self.value.get() })
    }

    // Runs `f` on the value under exclusive acquisition.
    fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _guard = self.lock.write();
        f(unsafe { &mut *self.value.get() })
    }

    /// Atomically replaces the value, returning the old one.
    pub fn get_and_set(&self, value: T) -> T {
        self.with_mut(|current| mem::replace(current, value))
    }
}

impl<T: Clone> AtomicReference<T> {
    /// Returns a copy of the current value.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Atomically sets the value, returning `value`.
    pub fn set(&self, value: T) -> T {
        self.with_mut(|current| {
            *current = value.clone();
        });
        value
    }
}

impl<T: PartialEq> AtomicReference<T> {
    /// Atomically sets the value to `update` if it currently equals `expect`.
    ///
    /// Returns `false`, leaving the value untouched, when it does not.
    pub fn compare_and_set(&self, expect: &T, update: T) -> bool {
        self.with_mut(|current| {
            if *current == *expect {
                *current = update;
                true
            } else {
                false
            }
        })
    }
}

impl<T: Numeric> AtomicReference<T> {
    /// Atomically adds `delta`, returning the new value.
    pub fn add_and_get(&self, delta: T) -> T {
        self.with_mut(|current| {
            *current = current.add_delta(delta);
            *current
        })
    }

    /// Atomically adds `delta`, returning the old value.
    pub fn get_and_add(&self, delta: T) -> T {
        self.with_mut(|current| {
            let old = *current;
            *current = old.add_delta(delta);
            old
        })
    }

    /// Atomically subtracts `delta`, returning the new value.
    pub fn subtract_and_get(&self, delta: T) -> T {
        self.with_mut(|current| {
            *current = current.sub_delta(delta);
            *current
        })
    }

    /// Atomically subtracts `delta`, returning the old value.
    pub fn get_and_subtract(&self, delta: T) -> T {
        self.with_mut(|current| {
            let old = *current;
            *current = old.sub_delta(delta);
            old
        })
    }
}

impl<T: Default> Default for AtomicReference<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for AtomicReference<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for AtomicReference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with(|value| f.debug_tuple("AtomicReference").field(value).finish())
    }
}
