//! Watchable, CAS-backed state containers.
//!
//! An [`Atom`] delegates every value mutation to a [`CasCell`] and layers
//! keyed notification on top of every mutation that changes the value.
//! Functional updates go through `swap`, an optimistic retry loop: read the
//! current value, compute the next one outside any lock, and publish it with
//! compare-and-set, retrying if another writer got there first.

mod cell;
mod policy;
mod watch;

pub use cell::CasCell;
pub use policy::RetryPolicy;
pub use watch::{WatchFn, Watchable};

use crate::atomic::AtomicReference;
use crate::error::{Error, Result};
use crossbeam_utils::Backoff;
use std::fmt;

/// A CAS-backed container with `swap`, `reset` and keyed watches.
///
/// Every successful transition (one `reset`, one winning `swap` iteration, or
/// one successful `compare_and_set`) notifies each watch exactly once with the
/// `(old, new)` pair of that transition. Notifications from transitions made on
/// different threads may arrive in any order.
///
/// The cell type `C` selects the transport: the default is an in-process
/// [`AtomicReference`], whose API is infallible. Fallible cells (such as the
/// manager-backed reference in [`remote`](crate::remote)) use the `try_*`
/// methods, which return [`Result`].
///
/// # Example
///
/// ```rust
/// use atomos::Atom;
/// use std::collections::BTreeMap;
///
/// let state: Atom<BTreeMap<&str, u32>> = Atom::new(BTreeMap::new());
/// state.add_watch("log", |_key, _atom, old, new| {
///     assert!(new.len() > old.len());
/// });
///
/// state.swap(|clients| {
///     let mut next = clients.clone();
///     next.insert("foo", 1);
///     next
/// });
/// assert_eq!(state.deref().get("foo"), Some(&1));
/// ```
pub struct Atom<T, C = AtomicReference<T>> {
    cell: C,
    watches: Watchable<Atom<T, C>, T>,
    policy: RetryPolicy,
}

impl<T, C> Atom<T, C> {
    /// Wraps an existing cell.
    pub fn with_cell(cell: C) -> Self {
        Self {
            cell,
            watches: Watchable::new(),
            policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy used by `swap` and `try_swap`.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The retry policy.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// The underlying cell.
    pub fn cell(&self) -> &C {
        &self.cell
    }

    /// Registers `f` under `key`. It is called as `f(key, atom, old, new)`
    /// after every successful transition.
    pub fn add_watch<F>(&self, key: impl Into<String>, f: F)
    where
        F: Fn(&str, &Self, &T, &T) + Send + Sync + 'static,
    {
        self.watches.add_watch(key, f);
    }

    /// Removes the watch under `key`. Returns `true` if one was registered.
    pub fn remove_watch(&self, key: &str) -> bool {
        self.watches.remove_watch(key)
    }

    /// The watch table.
    pub fn watches(&self) -> &Watchable<Self, T> {
        &self.watches
    }

    /// Invokes every watch with `(old, new)`.
    pub fn notify_watches(&self, old: &T, new: &T) {
        self.watches.notify_watches(self, old, new);
    }
}

impl<T: Clone, C: CasCell<T>> Atom<T, C> {
    // One optimistic iteration: `Ok(None)` means the CAS lost a race. The CAS
    // compares against the witness of the read, not a re-encoding of `old`.
    fn attempt<F>(&self, f: &mut F) -> Result<Option<T>, C::Error>
    where
        F: FnMut(&T) -> T,
    {
        let (old, witness) = self.cell.load_witnessed()?;
        let new = f(&old);
        if self
            .cell
            .compare_witnessed_and_set(&old, &witness, new.clone())?
        {
            self.notify_watches(&old, &new);
            Ok(Some(new))
        } else {
            Ok(None)
        }
    }
}

impl<T, C> Atom<T, C>
where
    T: Clone,
    C: CasCell<T>,
    Error: From<C::Error>,
{
    /// Returns the current value.
    pub fn try_deref(&self) -> Result<T> {
        Ok(self.cell.load()?)
    }

    /// Applies `f` to the current value until the result is published by
    /// compare-and-set, then returns the new value.
    ///
    /// `f` may run several times and must not have side effects. Honours the
    /// retry policy: with a limit, gives up with [`Error::RetriesExhausted`].
    pub fn try_swap<F>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(&T) -> T,
    {
        let backoff = Backoff::new();
        let mut attempts = 0_usize;
        loop {
            attempts += 1;
            if let Some(new) = self.attempt(&mut f)? {
                return Ok(new);
            }
            if let Some(limit) = self.policy.limit {
                if attempts >= limit.get() {
                    log_debug!(attempts, "swap retries exhausted");
                    return Err(Error::RetriesExhausted { attempts });
                }
            }
            if self.policy.backoff {
                backoff.snooze();
            }
        }
    }

    /// Unconditionally stores `value`, returning the value it replaced.
    pub fn try_reset(&self, value: T) -> Result<T> {
        let old = self.cell.exchange(value.clone())?;
        self.notify_watches(&old, &value);
        Ok(old)
    }

    /// Stores `update` if the current value equals `expect`, notifying on success.
    pub fn try_compare_and_set(&self, expect: &T, update: T) -> Result<bool> {
        let swapped = self.cell.compare_and_set(expect, update.clone())?;
        if swapped {
            self.notify_watches(expect, &update);
        }
        Ok(swapped)
    }
}

impl<T: Clone + PartialEq> Atom<T> {
    /// Creates an in-process atom holding `value`.
    pub fn new(value: T) -> Self {
        Self::with_cell(AtomicReference::new(value))
    }

    /// Returns the current value.
    #[allow(clippy::should_implement_trait)]
    pub fn deref(&self) -> T {
        self.cell.get()
    }

    /// Applies `f` to the current value until the result is published by
    /// compare-and-set, then returns the new value.
    ///
    /// `f` may run several times and must not have side effects. This never
    /// gives up, whatever the policy's limit: under pathological contention it
    /// may not return. Use [`Atom::try_swap`] for a bounded attempt count.
    pub fn swap<F>(&self, mut f: F) -> T
    where
        F: FnMut(&T) -> T,
    {
        let backoff = Backoff::new();
        loop {
            match self.attempt(&mut f) {
                Ok(Some(new)) => return new,
                Ok(None) => {}
                Err(never) => match never {},
            }
            if self.policy.backoff {
                backoff.snooze();
            }
        }
    }

    /// Unconditionally stores `value`, returning the value it replaced.
    pub fn reset(&self, value: T) -> T {
        let old = self.cell.get_and_set(value.clone());
        self.notify_watches(&old, &value);
        old
    }

    /// Stores `update` if the current value equals `expect`, notifying on success.
    pub fn compare_and_set(&self, expect: &T, update: T) -> bool {
        let swapped = self.cell.compare_and_set(expect, update.clone());
        if swapped {
            self.notify_watches(expect, &update);
        }
        swapped
    }
}

impl<T: Clone + PartialEq + Default> Default for Atom<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T, C: fmt::Debug> fmt::Debug for Atom<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom")
            .field("cell", &self.cell)
            .field("watches", &self.watches)
            .field("policy", &self.policy)
            .finish()
    }
}
