//! # `atomos` - Atomic, Observable State Containers
//!
//! Lock-based atomic references and watchable atoms for threads and, separately,
//! cooperating processes. Every primitive in this crate is built from mutual
//! exclusion; no hardware compare-and-swap on the guarded value is assumed.
//!
//! ## Architecture
//!
//! The crate is stratified leaf-first:
//!
//! 1. **Gates** ([`sync::RawMutex`], [`sync::ReadersWriterLock`]):
//!    - A parking mutex that may be released by a thread other than the acquirer
//!    - A reader-preferring readers-writer lock built from two gates and a count
//!
//! 2. **Atomic cells** ([`AtomicReference<T>`], [`TypedAtomic`]):
//!    - `get`/`set`/`get_and_set`/`compare_and_set` under the readers-writer lock
//!    - Delta operations only where the element type is [`Numeric`]
//!    - Runtime-typed cells that reject values of the wrong [`Kind`]
//!
//! 3. **Atoms** ([`Atom<T, C>`]):
//!    - Functional update (`swap`) by optimistic CAS retry
//!    - Keyed watches notified once per successful transition
//!
//! 4. **Process-spanning variants** (unix only):
//!    - [`shm::SharedAtomic`]: fixed-width scalars in POSIX shared memory
//!    - [`remote::RemoteAtomicReference`]: arbitrary values hosted by a manager
//!      process and reached over a Unix socket; [`remote::RemoteAtom`] layers
//!      the atom contract on top of it
//!
//! ## Example
//!
//! ```rust
//! use atomos::Atom;
//! use std::thread;
//!
//! let counter = Atom::new(0_u64);
//!
//! thread::scope(|s| {
//!     for _ in 0..4 {
//!         s.spawn(|| {
//!             for _ in 0..100 {
//!                 counter.swap(|n| n + 1);
//!             }
//!         });
//!     }
//! });
//!
//! assert_eq!(counter.deref(), 400);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

#[macro_use]
mod log;

pub mod atom;
pub mod atomic;
pub mod error;
#[cfg(unix)]
pub mod remote;
#[cfg(unix)]
pub mod shm;
pub mod sync;

pub use atom::{Atom, CasCell, RetryPolicy, Watchable};
pub use atomic::{
    AtomicBoolean, AtomicFloat, AtomicInteger, AtomicLong, AtomicNumber, AtomicReference, Kind,
    Numeric, TypedAtomic,
};
pub use error::{Error, Result};
pub use sync::{Mutex, RawMutex, ReadersWriterLock};

const _: () = {
    use core::mem;

    // The lock is two gates and a counter; it should stay a handful of words.
    assert!(mem::size_of::<ReadersWriterLock>() <= mem::size_of::<usize>() * 12);
};
