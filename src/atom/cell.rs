use crate::atomic::{AtomicReference, TypedAtomic};
use crate::error::Error;
use serde_json::Value;
use std::convert::Infallible;

/// The compare-and-set surface an [`Atom`](super::Atom) is built on.
///
/// Local cells are infallible; cells that cross a process boundary report
/// transport and codec failures through `Error`.
pub trait CasCell<T> {
    /// Failure raised by the cell itself. A lost CAS race is not a failure.
    type Error;

    /// What a read observed beyond the decoded value.
    ///
    /// A cell whose stored form can differ from `T`'s (a JSON document that
    /// decodes lossily, say) records the stored form here so that a later
    /// [`compare_witnessed_and_set`](Self::compare_witnessed_and_set) compares
    /// against exactly what was read. Cells that store `T` itself use `()`.
    type Witness;

    /// Returns the current value.
    fn load(&self) -> Result<T, Self::Error>;

    /// Returns the current value together with its witness.
    fn load_witnessed(&self) -> Result<(T, Self::Witness), Self::Error>;

    /// Atomically replaces the value, returning the old one.
    fn exchange(&self, value: T) -> Result<T, Self::Error>;

    /// Atomically stores `update` if the current value equals `expect`.
    fn compare_and_set(&self, expect: &T, update: T) -> Result<bool, Self::Error>;

    /// Atomically stores `update` if the cell still holds what
    /// [`load_witnessed`](Self::load_witnessed) returned as `(expect, witness)`.
    fn compare_witnessed_and_set(
        &self,
        expect: &T,
        witness: &Self::Witness,
        update: T,
    ) -> Result<bool, Self::Error>;
}

impl<T: Clone + PartialEq> CasCell<T> for AtomicReference<T> {
    type Error = Infallible;
    type Witness = ();

    fn load(&self) -> Result<T, Infallible> {
        Ok(self.get())
    }

    fn load_witnessed(&self) -> Result<(T, ()), Infallible> {
        Ok((self.get(), ()))
    }

    fn exchange(&self, value: T) -> Result<T, Infallible> {
        Ok(self.get_and_set(value))
    }

    fn compare_and_set(&self, expect: &T, update: T) -> Result<bool, Infallible> {
        Ok(AtomicReference::compare_and_set(self, expect, update))
    }

    fn compare_witnessed_and_set(
        &self,
        expect: &T,
        _: &(),
        update: T,
    ) -> Result<bool, Infallible> {
        Ok(AtomicReference::compare_and_set(self, expect, update))
    }
}

impl CasCell<Value> for TypedAtomic {
    type Error = Error;
    type Witness = ();

    fn load(&self) -> Result<Value, Error> {
        Ok(self.get())
    }

    fn load_witnessed(&self) -> Result<(Value, ()), Error> {
        Ok((self.get(), ()))
    }

    fn exchange(&self, value: Value) -> Result<Value, Error> {
        self.get_and_set(value)
    }

    fn compare_and_set(&self, expect: &Value, update: Value) -> Result<bool, Error> {
        TypedAtomic::compare_and_set(self, expect, update)
    }

    fn compare_witnessed_and_set(
        &self,
        expect: &Value,
        _: &(),
        update: Value,
    ) -> Result<bool, Error> {
        TypedAtomic::compare_and_set(self, expect, update)
    }
}
