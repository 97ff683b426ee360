use super::scalar::ScalarKind;
use crate::error::{Error, Result};
use crossbeam_utils::Backoff;
use libc::{c_int, c_void, MAP_FAILED, MAP_SHARED, O_CREAT, O_EXCL, O_RDWR, PROT_READ, PROT_WRITE};
use std::cell::UnsafeCell;
use std::ffi::{CStr, CString};
use std::io;
use std::mem;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

// "ATOM"; written last by the creator.
const MAGIC: u32 = 0x4154_4f4d;

// How long `open` waits for a concurrent creator to size and initialize.
const INIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Layout of a shared region. Zero-filled by `ftruncate` before initialization.
#[repr(C)]
struct Slot {
    magic: AtomicU32,
    kind: AtomicU32,
    mutex: UnsafeCell<libc::pthread_mutex_t>,
    bits: UnsafeCell<u64>,
}

/// A named POSIX shared memory mapping holding one [`Slot`].
pub(crate) struct Region {
    slot: NonNull<Slot>,
    name: CString,
    owner: bool,
}

// Safety: the slot lives in shared memory and `bits` is only touched with the
// process-shared mutex held.
unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Region {
    const LEN: usize = mem::size_of::<Slot>();

    /// Creates the region `name`, which must not exist yet.
    pub(crate) fn create(name: &str, kind: ScalarKind, bits: u64) -> Result<Self> {
        let name = shm_name(name)?;
        let fd = unsafe { shm_open(&name, O_CREAT | O_EXCL | O_RDWR) };
        if fd < 0 {
            return Err(io::Error::last_os_error().into());
        }

        let mapped = unsafe { size_and_map(fd) };
        let slot = match mapped {
            Ok(slot) => slot,
            Err(err) => {
                unsafe { libc::shm_unlink(name.as_ptr()) };
                return Err(err);
            }
        };

        let region = Self {
            slot,
            name,
            owner: true,
        };
        unsafe { region.initialize(kind, bits)? };
        log_debug!(name = ?region.name, kind = kind.name(), "created shared region");
        Ok(region)
    }

    /// Attaches to the existing region `name`, checking its element type.
    ///
    /// A region whose creator is still setting it up is waited for, up to a
    /// short deadline.
    pub(crate) fn open(name: &str, kind: ScalarKind) -> Result<Self> {
        let name = shm_name(name)?;
        let fd = unsafe { shm_open(&name, O_RDWR) };
        if fd < 0 {
            return Err(io::Error::last_os_error().into());
        }

        let deadline = Instant::now() + INIT_TIMEOUT;
        let slot = unsafe { map_existing(fd, deadline)? };
        let region = Self {
            slot,
            name,
            owner: false,
        };

        let initialized =
            wait_until(deadline, || Ok(region.slot().magic.load(Ordering::Acquire) == MAGIC))?;
        if !initialized {
            return Err(Error::InvalidRegion(format!(
                "{:?} was never initialized",
                region.name
            )));
        }

        let tag = region.slot().kind.load(Ordering::Acquire);
        let found = ScalarKind::from_tag(tag)
            .ok_or_else(|| Error::InvalidRegion(format!("unknown element tag {tag}")))?;
        if found != kind {
            return Err(Error::TypeMismatch {
                expected: kind.name(),
                found: found.name(),
            });
        }

        log_debug!(name = ?region.name, kind = kind.name(), "opened shared region");
        Ok(region)
    }

    /// Removes the name `name` from the system. Existing mappings stay valid.
    pub(crate) fn unlink(name: &str) -> Result<()> {
        let name = shm_name(name)?;
        if unsafe { libc::shm_unlink(name.as_ptr()) } != 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }

    /// The normalized region name, including the leading `/`.
    pub(crate) fn name(&self) -> &CStr {
        &self.name
    }

    /// Locks the region's mutex.
    pub(crate) fn lock(&self) -> Result<RegionGuard<'_>> {
        check(unsafe { libc::pthread_mutex_lock(self.slot().mutex.get()) })?;
        Ok(RegionGuard { region: self })
    }

    fn slot(&self) -> &Slot {
        unsafe { self.slot.as_ref() }
    }

    unsafe fn initialize(&self, kind: ScalarKind, bits: u64) -> Result<()> {
        let slot = self.slot();
        let mut attr: libc::pthread_mutexattr_t = unsafe { mem::zeroed() };
        unsafe {
            check(libc::pthread_mutexattr_init(&mut attr))?;
            let configured = check(libc::pthread_mutexattr_setpshared(
                &mut attr,
                libc::PTHREAD_PROCESS_SHARED,
            ))
            .and_then(|()| check(libc::pthread_mutex_init(slot.mutex.get(), &attr)));
            libc::pthread_mutexattr_destroy(&mut attr);
            configured?;

            *slot.bits.get() = bits;
        }
        slot.kind.store(kind as u32, Ordering::Release);
        slot.magic.store(MAGIC, Ordering::Release);
        Ok(())
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.slot.as_ptr().cast::<c_void>(), Self::LEN);
            if self.owner {
                libc::shm_unlink(self.name.as_ptr());
                log_debug!(name = ?self.name, "unlinked shared region");
            }
        }
    }
}

/// Holds a region's mutex. Unlocks on drop.
pub(crate) struct RegionGuard<'a> {
    region: &'a Region,
}

impl RegionGuard<'_> {
    pub(crate) fn bits(&self) -> u64 {
        unsafe { *self.region.slot().bits.get() }
    }

    pub(crate) fn set_bits(&mut self, bits: u64) {
        unsafe { *self.region.slot().bits.get() = bits };
    }
}

impl Drop for RegionGuard<'_> {
    fn drop(&mut self) {
        let rc = unsafe { libc::pthread_mutex_unlock(self.region.slot().mutex.get()) };
        debug_assert_eq!(rc, 0, "unlock of a region mutex we hold");
    }
}

fn check(rc: c_int) -> Result<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::from_raw_os_error(rc).into())
    }
}

fn shm_name(name: &str) -> Result<CString> {
    let name = if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    };
    CString::new(name).map_err(|_| Error::InvalidRegion("name contains a NUL byte".into()))
}

#[cfg(not(target_vendor = "apple"))]
unsafe fn shm_open(name: &CStr, flags: c_int) -> c_int {
    unsafe { libc::shm_open(name.as_ptr(), flags, 0o600 as libc::mode_t) }
}

#[cfg(target_vendor = "apple")]
unsafe fn shm_open(name: &CStr, flags: c_int) -> c_int {
    unsafe { libc::shm_open(name.as_ptr(), flags, 0o600 as libc::c_uint) }
}

unsafe fn map(fd: c_int) -> Result<NonNull<Slot>> {
    let ptr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            Region::LEN,
            PROT_READ | PROT_WRITE,
            MAP_SHARED,
            fd,
            0,
        )
    };
    if ptr == MAP_FAILED {
        return Err(io::Error::last_os_error().into());
    }
    NonNull::new(ptr.cast::<Slot>()).ok_or_else(|| Error::InvalidRegion("null mapping".into()))
}

// Sizes a freshly created object and maps it. Closes `fd` in every case.
unsafe fn size_and_map(fd: c_int) -> Result<NonNull<Slot>> {
    let result = unsafe {
        if libc::ftruncate(fd, Region::LEN as libc::off_t) == 0 {
            map(fd)
        } else {
            Err(io::Error::last_os_error().into())
        }
    };
    unsafe { libc::close(fd) };
    result
}

// Maps an object created by another process once it has been sized. Closes
// `fd` in every case.
unsafe fn map_existing(fd: c_int, deadline: Instant) -> Result<NonNull<Slot>> {
    let sized = wait_until(deadline, || {
        let mut stat: libc::stat = unsafe { mem::zeroed() };
        if unsafe { libc::fstat(fd, &mut stat) } != 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(usize::try_from(stat.st_size).unwrap_or(0) >= Region::LEN)
    });
    let result = match sized {
        Ok(true) => unsafe { map(fd) },
        Ok(false) => Err(Error::InvalidRegion("region is smaller than its header".into())),
        Err(err) => Err(err),
    };
    unsafe { libc::close(fd) };
    result
}

// Polls `ready` until it holds or `deadline` passes.
fn wait_until(deadline: Instant, mut ready: impl FnMut() -> Result<bool>) -> Result<bool> {
    let backoff = Backoff::new();
    loop {
        if ready()? {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        if backoff.is_completed() {
            thread::sleep(Duration::from_millis(1));
        } else {
            backoff.snooze();
        }
    }
}
