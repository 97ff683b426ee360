use super::region::Region;
use super::scalar::SharedScalar;
use crate::atom::CasCell;
use crate::atomic::Numeric;
use crate::error::{Error, Result};
use std::fmt;
use std::marker::PhantomData;

/// A scalar atomic in named OS shared memory.
///
/// The process that calls [`SharedAtomic::create`] owns the name and removes
/// it on drop; other processes [`open`](SharedAtomic::open) it by name. Opening
/// with a different element type fails with [`Error::TypeMismatch`].
///
/// Mirrors [`AtomicReference`](crate::AtomicReference): `get`, `set`,
/// `get_and_set`, `compare_and_set`, and the delta operations for numeric
/// element types. There are no watches at this layer.
///
/// # Example
///
/// ```rust,no_run
/// use atomos::shm::SharedAtomicLong;
///
/// let counter = SharedAtomicLong::create("atomos-doc-counter", 0)?;
/// let other = SharedAtomicLong::open("atomos-doc-counter")?;
/// other.add_and_get(2)?;
/// assert_eq!(counter.get()?, 2);
/// # Ok::<(), atomos::Error>(())
/// ```
pub struct SharedAtomic<T: SharedScalar> {
    region: Region,
    _marker: PhantomData<T>,
}

impl<T: SharedScalar> SharedAtomic<T> {
    /// Creates the shared object `name` holding `initial`. Fails if it exists.
    pub fn create(name: &str, initial: T) -> Result<Self> {
        Ok(Self {
            region: Region::create(name, T::KIND, initial.to_bits())?,
            _marker: PhantomData,
        })
    }

    /// Attaches to the shared object `name`.
    pub fn open(name: &str) -> Result<Self> {
        Ok(Self {
            region: Region::open(name, T::KIND)?,
            _marker: PhantomData,
        })
    }

    /// Removes `name` from the system without waiting for its owner.
    pub fn unlink(name: &str) -> Result<()> {
        Region::unlink(name)
    }

    /// The object name, including the leading `/`.
    pub fn name(&self) -> &str {
        self.region.name().to_str().unwrap_or_default()
    }

    /// Returns the value.
    pub fn get(&self) -> Result<T> {
        let guard = self.region.lock()?;
        Ok(T::from_bits(guard.bits()))
    }

    /// Sets the value, returning `value`.
    pub fn set(&self, value: T) -> Result<T> {
        self.update(|_| (value, value))
    }

    /// Replaces the value, returning the old one.
    pub fn get_and_set(&self, value: T) -> Result<T> {
        self.update(|old| (value, old))
    }

    /// Stores `update` if the value equals `expect`.
    pub fn compare_and_set(&self, expect: T, update: T) -> Result<bool> {
        self.update(|old| {
            if old == expect {
                (update, true)
            } else {
                (old, false)
            }
        })
    }

    // Read-modify-write under the region mutex. `f` returns (next value, result).
    fn update<R>(&self, f: impl FnOnce(T) -> (T, R)) -> Result<R> {
        let mut guard = self.region.lock()?;
        let (next, result) = f(T::from_bits(guard.bits()));
        guard.set_bits(next.to_bits());
        Ok(result)
    }
}

impl<T: SharedScalar + Numeric> SharedAtomic<T> {
    /// Adds `delta`, returning the new value.
    pub fn add_and_get(&self, delta: T) -> Result<T> {
        self.update(|old| {
            let new = old.add_delta(delta);
            (new, new)
        })
    }

    /// Adds `delta`, returning the old value.
    pub fn get_and_add(&self, delta: T) -> Result<T> {
        self.update(|old| (old.add_delta(delta), old))
    }

    /// Subtracts `delta`, returning the new value.
    pub fn subtract_and_get(&self, delta: T) -> Result<T> {
        self.update(|old| {
            let new = old.sub_delta(delta);
            (new, new)
        })
    }

    /// Subtracts `delta`, returning the old value.
    pub fn get_and_subtract(&self, delta: T) -> Result<T> {
        self.update(|old| (old.sub_delta(delta), old))
    }
}

impl<T: SharedScalar> CasCell<T> for SharedAtomic<T> {
    type Error = Error;
    type Witness = ();

    fn load(&self) -> Result<T> {
        self.get()
    }

    fn load_witnessed(&self) -> Result<(T, ())> {
        Ok((self.get()?, ()))
    }

    fn exchange(&self, value: T) -> Result<T> {
        self.get_and_set(value)
    }

    fn compare_and_set(&self, expect: &T, update: T) -> Result<bool> {
        SharedAtomic::compare_and_set(self, *expect, update)
    }

    fn compare_witnessed_and_set(&self, expect: &T, _: &(), update: T) -> Result<bool> {
        SharedAtomic::compare_and_set(self, *expect, update)
    }
}

impl<T: SharedScalar + fmt::Debug> fmt::Debug for SharedAtomic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SharedAtomic");
        s.field("name", &self.name());
        match self.get() {
            Ok(value) => s.field("value", &value),
            Err(_) => s.field("value", &format_args!("<unavailable>")),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shm::{SharedAtomicBoolean, SharedAtomicInteger};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn unique(tag: &str) -> String {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        format!(
            "atomos-{tag}-{}-{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        )
    }

    #[test]
    fn test_create_get_set() {
        let name = unique("set");
        let cell = SharedAtomicInteger::create(&name, 0).unwrap();
        assert_eq!(cell.get().unwrap(), 0);
        assert_eq!(cell.set(4).unwrap(), 4);
        assert_eq!(cell.get_and_set(5).unwrap(), 4);
        assert!(cell.compare_and_set(5, 6).unwrap());
        assert!(!cell.compare_and_set(5, 7).unwrap());
        assert_eq!(cell.get().unwrap(), 6);
        assert!(cell.name().starts_with('/'));
    }

    #[test]
    fn test_numeric_ops() {
        let cell = SharedAtomicInteger::create(&unique("num"), 0).unwrap();
        assert_eq!(cell.add_and_get(1).unwrap(), 1);
        assert_eq!(cell.get_and_add(1).unwrap(), 1);
        assert_eq!(cell.subtract_and_get(3).unwrap(), -1);
        assert_eq!(cell.get_and_subtract(1).unwrap(), -1);
        assert_eq!(cell.get().unwrap(), -2);
    }

    #[test]
    fn test_open_sees_same_memory() {
        let name = unique("open");
        let owner = SharedAtomicBoolean::create(&name, false).unwrap();
        let attached = SharedAtomicBoolean::open(&name).unwrap();
        assert!(attached.compare_and_set(false, true).unwrap());
        assert!(owner.get().unwrap());
    }

    #[test]
    fn test_open_with_wrong_type_is_mismatch() {
        let name = unique("kind");
        let _owner = SharedAtomicBoolean::create(&name, true).unwrap();
        let err = SharedAtomicInteger::open(&name).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: "i32",
                found: "bool"
            }
        ));
    }

    #[test]
    fn test_create_twice_fails() {
        let name = unique("dup");
        let _owner = SharedAtomicInteger::create(&name, 0).unwrap();
        assert!(matches!(
            SharedAtomicInteger::create(&name, 0),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_owner_drop_unlinks() {
        let name = unique("drop");
        drop(SharedAtomicInteger::create(&name, 0).unwrap());
        assert!(SharedAtomicInteger::open(&name).is_err());
    }

    #[test]
    fn test_concurrent_handles() {
        let name = unique("threads");
        let owner = SharedAtomic::<i64>::create(&name, 0).unwrap();
        thread::scope(|s| {
            for _ in 0..8 {
                let name = name.as_str();
                s.spawn(move || {
                    let cell = SharedAtomic::<i64>::open(name).unwrap();
                    for _ in 0..500 {
                        cell.add_and_get(1).unwrap();
                    }
                });
            }
        });
        assert_eq!(owner.get().unwrap(), 4000);
    }
}
