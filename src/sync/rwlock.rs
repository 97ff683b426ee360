//! Reader-preferring readers-writer lock.

use super::raw_mutex::RawMutex;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A readers-writer lock built from two gates and a reader count.
///
/// Any number of shared holders may be active while no exclusive holder is.
/// The first reader of a cohort closes `writer_gate`; the last one opens it.
/// Exclusive acquisition is simply taking `writer_gate`.
///
/// The lock prefers readers: while readers keep arriving, a waiting writer
/// may starve. It is not reentrant and acquisition never times out.
///
/// # Example
///
/// ```rust
/// use atomos::ReadersWriterLock;
///
/// let lock = ReadersWriterLock::new();
/// lock.acquire_shared();
/// lock.acquire_shared();
/// assert_eq!(lock.reader_count(), 2);
/// assert!(!lock.try_acquire_exclusive());
///
/// lock.release_shared().unwrap();
/// lock.release_shared().unwrap();
/// assert!(lock.try_acquire_exclusive());
/// lock.release_exclusive().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct ReadersWriterLock {
    reader_gate: RawMutex,
    writer_gate: RawMutex,
    // Only written with `reader_gate` held.
    readers: AtomicUsize,
    // Set while a writer, not a reader cohort, holds `writer_gate`.
    writer: AtomicBool,
}

impl ReadersWriterLock {
    /// Creates an unlocked readers-writer lock.
    pub const fn new() -> Self {
        Self {
            reader_gate: RawMutex::new(),
            writer_gate: RawMutex::new(),
            readers: AtomicUsize::new(0),
            writer: AtomicBool::new(false),
        }
    }

    /// Acquires shared access, blocking while a writer holds the lock.
    pub fn acquire_shared(&self) {
        self.reader_gate.lock();
        let readers = self.readers.load(Ordering::Relaxed);
        if readers == 0 {
            self.writer_gate.lock();
        }
        self.readers.store(readers + 1, Ordering::Release);
        open(&self.reader_gate);
    }

    /// Acquires shared access only if it is available without blocking.
    pub fn try_acquire_shared(&self) -> bool {
        if !self.reader_gate.try_lock() {
            return false;
        }
        let readers = self.readers.load(Ordering::Relaxed);
        if readers == 0 && !self.writer_gate.try_lock() {
            open(&self.reader_gate);
            return false;
        }
        self.readers.store(readers + 1, Ordering::Release);
        open(&self.reader_gate);
        true
    }

    /// Releases one shared acquisition. The last reader reopens the writer gate.
    ///
    /// Returns [`Error::NotHeld`] if no shared acquisition is outstanding.
    pub fn release_shared(&self) -> Result<()> {
        self.reader_gate.lock();
        let readers = self.readers.load(Ordering::Relaxed);
        if readers == 0 {
            open(&self.reader_gate);
            log_warn!("release_shared without a shared holder");
            return Err(Error::NotHeld);
        }

        self.readers.store(readers - 1, Ordering::Release);
        let released = if readers == 1 {
            self.writer_gate.unlock()
        } else {
            Ok(())
        };
        open(&self.reader_gate);
        released
    }

    /// Acquires exclusive access, blocking until no reader or writer holds the lock.
    pub fn acquire_exclusive(&self) {
        self.writer_gate.lock();
        self.writer.store(true, Ordering::Relaxed);
    }

    /// Acquires exclusive access only if it is available without blocking.
    pub fn try_acquire_exclusive(&self) -> bool {
        if !self.writer_gate.try_lock() {
            return false;
        }
        self.writer.store(true, Ordering::Relaxed);
        true
    }

    /// Releases exclusive access.
    ///
    /// Returns [`Error::NotHeld`] if the lock is free or held by readers,
    /// including a first reader that has closed the writer gate but not yet
    /// been counted.
    pub fn release_exclusive(&self) -> Result<()> {
        if self
            .writer
            .compare_exchange(true, false, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            log_warn!("release_exclusive without an exclusive holder");
            return Err(Error::NotHeld);
        }
        self.writer_gate.unlock()
    }

    /// Number of outstanding shared acquisitions.
    pub fn reader_count(&self) -> usize {
        self.readers.load(Ordering::Acquire)
    }

    /// Returns `true` if a reader cohort or a writer currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.writer_gate.is_locked()
    }

    /// Scoped shared access.
    pub fn read(&self) -> SharedGuard<'_> {
        self.acquire_shared();
        SharedGuard { lock: self }
    }

    /// Scoped exclusive access.
    pub fn write(&self) -> ExclusiveGuard<'_> {
        self.acquire_exclusive();
        ExclusiveGuard { lock: self }
    }
}

// Opens a gate this lock closed itself a few lines earlier.
fn open(gate: &RawMutex) {
    let released = gate.unlock();
    debug_assert!(released.is_ok(), "gate opened twice");
}

/// Shared acquisition of a [`ReadersWriterLock`], released on drop.
#[must_use = "the shared lock is released as soon as the guard is dropped"]
pub struct SharedGuard<'a> {
    lock: &'a ReadersWriterLock,
}

impl Drop for SharedGuard<'_> {
    fn drop(&mut self) {
        let released = self.lock.release_shared();
        debug_assert!(released.is_ok(), "shared guard outlived its acquisition");
    }
}

/// Exclusive acquisition of a [`ReadersWriterLock`], released on drop.
#[must_use = "the exclusive lock is released as soon as the guard is dropped"]
pub struct ExclusiveGuard<'a> {
    lock: &'a ReadersWriterLock,
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        let released = self.lock.release_exclusive();
        debug_assert!(released.is_ok(), "exclusive guard outlived its acquisition");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_exclusive_rejected_while_first_reader_enters() {
        let lock = ReadersWriterLock::new();

        // A first reader that has closed the writer gate but not yet stored
        // its count.
        lock.reader_gate.lock();
        lock.writer_gate.lock();
        assert_eq!(lock.reader_count(), 0);

        assert!(matches!(lock.release_exclusive(), Err(Error::NotHeld)));
        assert!(lock.writer_gate.is_locked());

        lock.readers.store(1, Ordering::Release);
        open(&lock.reader_gate);
        assert!(!lock.try_acquire_exclusive());
        lock.release_shared().unwrap();
        assert!(lock.try_acquire_exclusive());
        lock.release_exclusive().unwrap();
    }

    #[test]
    fn test_exclusive_release_is_not_bound_to_the_acquiring_thread() {
        let lock = ReadersWriterLock::new();
        lock.acquire_exclusive();
        std::thread::scope(|s| {
            s.spawn(|| lock.release_exclusive().unwrap());
        });
        assert!(matches!(lock.release_exclusive(), Err(Error::NotHeld)));
        assert!(!lock.is_locked());
    }
}
