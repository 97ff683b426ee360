//! Blocking lock primitives.
//!
//! Everything above this module is lock-based: the atomic cells guard their
//! value with a [`ReadersWriterLock`], which is built from two [`RawMutex`]
//! gates. No global lock exists; every cell owns its own instance.

mod mutex;
mod raw_mutex;
mod rwlock;
mod wait_queue;

pub use mutex::{Mutex, MutexGuard};
pub use raw_mutex::RawMutex;
pub use rwlock::{ExclusiveGuard, ReadersWriterLock, SharedGuard};
