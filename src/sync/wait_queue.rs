use std::cell::{Cell, UnsafeCell};
use std::marker::PhantomPinned;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread};

/// A node in the intrusive wait queue.
/// Must stay on the stack of the waiting thread until it has been notified.
pub(crate) struct WaitNode {
    thread: Thread,
    notified: AtomicBool,
    next: Cell<Option<NonNull<WaitNode>>>,
    _pin: PhantomPinned,
}

impl WaitNode {
    pub(crate) fn new() -> Self {
        Self {
            thread: thread::current(),
            notified: AtomicBool::new(false),
            next: Cell::new(None),
            _pin: PhantomPinned,
        }
    }

    /// Parks the current thread until [`WaitNode::wake`] is called on this node.
    ///
    /// Spurious unparks are absorbed by re-checking the flag.
    pub(crate) fn wait(&self) {
        while !self.notified.load(Ordering::Acquire) {
            thread::park();
        }
    }

    /// Wakes the thread waiting on `node`.
    ///
    /// # Safety
    /// `node` must have been popped from its queue and still be alive. The waiter
    /// may free the node as soon as the flag is set, so the thread handle is
    /// cloned first and the node is not touched afterwards.
    pub(crate) unsafe fn wake(node: NonNull<WaitNode>) {
        let ptr = node.as_ptr();
        let thread = unsafe { (*ptr).thread.clone() };
        unsafe { (*ptr).notified.store(true, Ordering::Release) };
        thread.unpark();
    }
}

/// A FIFO queue of waiting threads.
///
/// Uses a simple spinlock to protect the linked list operations.
/// Since operations are just pointer swaps, contention is minimal.
pub(crate) struct WaitQueue {
    head: UnsafeCell<Option<NonNull<WaitNode>>>,
    tail: UnsafeCell<Option<NonNull<WaitNode>>>,
    lock: AtomicBool,
}

impl WaitQueue {
    pub(crate) const fn new() -> Self {
        Self {
            head: UnsafeCell::new(None),
            tail: UnsafeCell::new(None),
            lock: AtomicBool::new(false),
        }
    }

    pub(crate) fn lock(&self) {
        while self.lock.swap(true, Ordering::Acquire) {
            std::hint::spin_loop();
        }
    }

    pub(crate) fn unlock(&self) {
        self.lock.store(false, Ordering::Release);
    }

    /// Adds a node to the back of the queue (caller must hold lock).
    ///
    /// # Safety
    /// Caller must hold the lock. The node must stay valid until it is popped.
    pub(crate) unsafe fn push_locked(&self, node: NonNull<WaitNode>) {
        let tail_ptr = self.tail.get();
        let head_ptr = self.head.get();

        unsafe {
            (*node.as_ptr()).next.set(None);

            if let Some(t) = *tail_ptr {
                (*t.as_ptr()).next.set(Some(node));
                *tail_ptr = Some(node);
            } else {
                *head_ptr = Some(node);
                *tail_ptr = Some(node);
            }
        }
    }

    /// Removes and returns the head node (caller must hold lock).
    ///
    /// # Safety
    /// Caller must hold the lock.
    pub(crate) unsafe fn pop_locked(&self) -> Option<NonNull<WaitNode>> {
        let head_ptr = self.head.get();
        let tail_ptr = self.tail.get();

        unsafe {
            let ret = *head_ptr;
            if let Some(h) = ret {
                *head_ptr = (*h.as_ptr()).next.get();
                if (*head_ptr).is_none() {
                    *tail_ptr = None;
                }
            }
            ret
        }
    }

    /// Checks if the queue is empty.
    pub(crate) fn is_empty(&self) -> bool {
        self.lock();
        let empty = unsafe { (*self.head.get()).is_none() };
        self.unlock();
        empty
    }
}

unsafe impl Sync for WaitQueue {}
unsafe impl Send for WaitQueue {}
