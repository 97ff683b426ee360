//! Fixed-width scalar atomics in OS shared memory.
//!
//! A [`SharedAtomic<T>`] lives in a named POSIX shared memory object, so any
//! process that knows the name can attach to it. The value is guarded by a
//! process-shared pthread mutex stored next to it, not by the in-process
//! readers-writer lock. Only types with a fixed bit layout can be shared;
//! arbitrary values go through [`remote`](crate::remote) instead.
//!
//! Operations return [`Result`](crate::Result) because the OS lock can fail.

mod atomic;
mod region;
mod scalar;

pub use atomic::SharedAtomic;
pub use scalar::{ScalarKind, SharedScalar};

/// Shared `i32`.
pub type SharedAtomicInteger = SharedAtomic<i32>;

/// Shared `i64`.
pub type SharedAtomicLong = SharedAtomic<i64>;

/// Shared `f64`.
pub type SharedAtomicFloat = SharedAtomic<f64>;

/// Shared `bool`.
pub type SharedAtomicBoolean = SharedAtomic<bool>;
