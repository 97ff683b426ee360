use super::wait_queue::{WaitNode, WaitQueue};
use crate::error::{Error, Result};
use crossbeam_utils::Backoff;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU8, Ordering};

/// A blocking binary gate that is not bound to the thread that acquired it.
///
/// Unlike `std::sync::Mutex`, `unlock` may be called from any thread. The
/// readers-writer lock relies on this: the first reader of a cohort closes the
/// writer gate and the last reader, possibly on another thread, opens it again.
///
/// The gate is not reentrant. Locking it twice from one thread deadlocks.
///
/// # States
/// - 0: Unlocked
/// - 1: Locked, no waiters
/// - 2: Locked, waiters may exist (contended)
pub struct RawMutex {
    state: AtomicU8,
    queue: WaitQueue,
}

impl RawMutex {
    const UNLOCKED: u8 = 0;
    const LOCKED: u8 = 1;
    const CONTENDED: u8 = 2;

    /// Creates an unlocked gate.
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(Self::UNLOCKED),
            queue: WaitQueue::new(),
        }
    }

    /// Acquires the gate, blocking until it is available.
    #[inline]
    pub fn lock(&self) {
        if self
            .state
            .compare_exchange(Self::UNLOCKED, Self::LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return;
        }
        self.lock_slow();
    }

    /// Acquires the gate if it is free. Never blocks.
    #[inline]
    pub fn try_lock(&self) -> bool {
        self.state
            .compare_exchange(Self::UNLOCKED, Self::LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[cold]
    fn lock_slow(&self) {
        let backoff = Backoff::new();
        while !backoff.is_completed() {
            if self.state.load(Ordering::Relaxed) == Self::UNLOCKED && self.try_lock() {
                return;
            }
            backoff.snooze();
        }

        loop {
            let node = WaitNode::new();

            unsafe {
                self.queue.lock();

                // Once a thread has queued, it only ever takes the gate in the
                // contended state so that its own unlock wakes the next waiter.
                if self.state.swap(Self::CONTENDED, Ordering::Acquire) == Self::UNLOCKED {
                    self.queue.unlock();
                    return;
                }

                self.queue.push_locked(NonNull::from(&node));
                self.queue.unlock();
            }

            node.wait();
        }
    }

    /// Releases the gate.
    ///
    /// Returns [`Error::NotHeld`] if the gate was not locked.
    pub fn unlock(&self) -> Result<()> {
        match self.state.compare_exchange(
            Self::LOCKED,
            Self::UNLOCKED,
            Ordering::Release,
            Ordering::Relaxed,
        ) {
            Ok(_) => Ok(()),
            Err(Self::UNLOCKED) => {
                log_warn!("unlock of a gate that is not held");
                Err(Error::NotHeld)
            }
            Err(_) => {
                self.unlock_slow();
                Ok(())
            }
        }
    }

    #[cold]
    fn unlock_slow(&self) {
        unsafe {
            self.queue.lock();
            self.state.store(Self::UNLOCKED, Ordering::Release);

            if let Some(node) = self.queue.pop_locked() {
                WaitNode::wake(node);
            }
            self.queue.unlock();
        }
    }

    /// Returns `true` if some holder currently owns the gate.
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) != Self::UNLOCKED
    }

    /// Returns `true` if threads are parked on the gate.
    pub fn has_waiters(&self) -> bool {
        !self.queue.is_empty()
    }
}

impl Default for RawMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RawMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawMutex")
            .field("locked", &self.is_locked())
            .finish()
    }
}

// Safety: all state is atomic or protected by the queue spinlock.
unsafe impl Sync for RawMutex {}
unsafe impl Send for RawMutex {}
