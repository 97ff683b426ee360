//! Atomic references hosted by a manager process.
//!
//! Arbitrary values cannot live in shared memory, so they are hosted by a
//! small request/response service instead: a manager process owns a
//! [`TypedAtomic`](crate::TypedAtomic) and answers `get`, `set`,
//! `get_and_set`, `compare_and_set` and `describe` over a Unix domain socket.
//! Callers hold a [`RemoteAtomicReference`] proxy.
//!
//! This path is much slower than the in-process one: every call, and every
//! CAS attempt of a [`RemoteAtom::swap`], is an IPC round trip. Watches stay
//! local to the process that registered them.
//!
//! ```rust,no_run
//! use atomos::remote::{Manager, ManagerOptions, RemoteAtom};
//! use atomos::Kind;
//!
//! let manager = Manager::spawn(ManagerOptions::new("atomos").kind(Kind::Integer))?;
//! let counter: RemoteAtom<i64> = manager.atom()?;
//! counter.swap(|n| n + 1)?;
//! assert_eq!(counter.deref()?, 1);
//! # Ok::<(), atomos::Error>(())
//! ```

mod client;
mod manager;
mod protocol;
mod server;

pub use client::RemoteAtomicReference;
pub use manager::{Manager, ManagerOptions};
pub use protocol::{Request, Response, WireError};
pub use server::Server;

use crate::atom::Atom;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// An [`Atom`] whose value is hosted by a manager process.
pub type RemoteAtom<T> = Atom<T, RemoteAtomicReference<T>>;

impl<T: Clone + Serialize + DeserializeOwned> Atom<T, RemoteAtomicReference<T>> {
    /// Connects a new atom to the manager listening on `path`.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::with_cell(RemoteAtomicReference::connect(path)?))
    }

    /// Returns the hosted value.
    #[allow(clippy::should_implement_trait)]
    pub fn deref(&self) -> Result<T> {
        self.try_deref()
    }

    /// Applies `f` until its result is published on the manager. See [`Atom::try_swap`].
    pub fn swap<F>(&self, f: F) -> Result<T>
    where
        F: FnMut(&T) -> T,
    {
        self.try_swap(f)
    }

    /// Unconditionally stores `value`, returning the value it replaced.
    pub fn reset(&self, value: T) -> Result<T> {
        self.try_reset(value)
    }

    /// Stores `update` if the hosted value equals `expect`, notifying on success.
    pub fn compare_and_set(&self, expect: &T, update: T) -> Result<bool> {
        self.try_compare_and_set(expect, update)
    }
}
