//! Atomic cells guarded by a [`ReadersWriterLock`](crate::sync::ReadersWriterLock).
//!
//! There is one generic cell, [`AtomicReference<T>`]. Delta operations are
//! available when `T` is [`Numeric`], so the familiar `AtomicInteger`,
//! `AtomicLong`, `AtomicFloat` and `AtomicBoolean` are plain aliases and the
//! element type is enforced by the compiler. Values whose type is only known
//! at runtime go through [`TypedAtomic`], which checks every write against a
//! declared [`Kind`].

mod numeric;
mod reference;
mod typed;

pub use numeric::Numeric;
pub use reference::AtomicReference;
pub use typed::{Kind, ParseKindError, TypedAtomic};

/// An atomic cell over a numeric element type.
pub type AtomicNumber<T> = AtomicReference<T>;

/// Atomic `i32`. Defaults to `0`.
pub type AtomicInteger = AtomicReference<i32>;

/// Atomic `i64`. Defaults to `0`.
pub type AtomicLong = AtomicReference<i64>;

/// Atomic `f64`. Defaults to `0.0`.
pub type AtomicFloat = AtomicReference<f64>;

/// Atomic `bool`. Defaults to `false`.
pub type AtomicBoolean = AtomicReference<bool>;
