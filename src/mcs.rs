//! MCS queue lock (Mellor-Crummey and Scott).
//!
//! A linked queue of caller-supplied per-thread nodes. Each waiter spins
//! on its own node's `locked` flag, a private cache line, giving strict
//! FIFO ordering in the order `exchange(tail, ..)` completes.
//! Unlike the mutex-family locks in this crate, there is no allocator
//! involved: the caller owns the [`McsNode`] and keeps it alive for the
//! whole time the lock is held.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use crate::backoff::Backoff;
use crate::pr;

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// A per-thread queue node for [`McsLock`].
///
/// Caller-owned: initialize once per thread with [`McsNode::new`] and
/// reuse it across acquisitions, passing the same node to the matching
/// `lock`/`unlock` pair.
#[repr(C)]
pub struct McsNode {
    next: AtomicPtr<McsNode>,
    locked: AtomicU32,
}

impl McsNode {
    /// Create a fresh, unqueued node.
    #[inline]
    pub const fn new() -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
            locked: AtomicU32::new(UNLOCKED),
        }
    }
}

impl Default for McsNode {
    fn default() -> Self {
        Self::new()
    }
}

/// An MCS queue lock guarding `T`.
#[repr(C)]
pub struct McsLock<T: ?Sized> {
    tail: AtomicPtr<McsNode>,
    data: UnsafeCell<T>,
}

impl<T> McsLock<T> {
    /// Create a new unlocked lock. `tail` starts null, meaning the queue
    /// is empty.
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            tail: AtomicPtr::new(ptr::null_mut()),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquire the lock using `node` as this thread's queue entry.
    ///
    /// # Safety
    ///
    /// `node` must not be shared with, or concurrently used by, another
    /// thread, and must remain valid (not moved, not dropped) until the
    /// matching [`McsLock::unlock`] call with the same node reference
    /// completes.
    #[inline]
    pub unsafe fn lock<'a>(&self, node: &'a McsNode) -> McsLockGuard<'a, '_, T> {
        node.next.store(ptr::null_mut(), Ordering::Relaxed);
        node.locked.store(UNLOCKED, Ordering::Relaxed);

        let node_ptr = node as *const McsNode as *mut McsNode;
        let prev = self.tail.swap(node_ptr, Ordering::AcqRel);

        if !prev.is_null() {
            node.locked.store(LOCKED, Ordering::Relaxed);
            (*prev).next.store(node_ptr, Ordering::Release);

            let mut backoff = Backoff::new();
            while node.locked.load(Ordering::Acquire) != UNLOCKED {
                backoff.spin();
            }
        }

        McsLockGuard { lock: self, node }
    }

    /// Try to acquire without spinning, using `node` as this thread's
    /// queue entry.
    ///
    /// Only succeeds against a fresh, empty queue: it CASes `tail` from
    /// null to `node` and fails immediately if anyone else is already
    /// queued, rather than joining the queue and waiting. A `try_lock`
    /// that lost the race leaves `node` untouched and safe to reuse on a
    /// later call.
    ///
    /// # Safety
    ///
    /// Same contract as [`McsLock::lock`]: `node` must not be shared with,
    /// or concurrently used by, another thread, and on success must
    /// remain valid until the matching unlock (guard drop) completes.
    #[inline]
    pub unsafe fn try_lock<'a>(&self, node: &'a McsNode) -> Option<McsLockGuard<'a, '_, T>> {
        node.next.store(ptr::null_mut(), Ordering::Relaxed);
        node.locked.store(UNLOCKED, Ordering::Relaxed);

        let node_ptr = node as *const McsNode as *mut McsNode;
        if self
            .tail
            .compare_exchange(ptr::null_mut(), node_ptr, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            Some(McsLockGuard { lock: self, node })
        } else {
            None
        }
    }

    /// Release the lock held via `node`.
    ///
    /// # Safety
    ///
    /// `node` must be the same node reference passed to the matching
    /// [`McsLock::lock`] call.
    #[inline]
    unsafe fn unlock(&self, node: &McsNode) {
        let node_ptr = node as *const McsNode as *mut McsNode;
        let next = node.next.load(Ordering::Relaxed);

        if next.is_null() {
            if self
                .tail
                .compare_exchange(node_ptr, ptr::null_mut(), Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }

            let mut backoff = Backoff::new();
            let mut successor = node.next.load(Ordering::Acquire);
            while successor.is_null() {
                backoff.spin();
                successor = node.next.load(Ordering::Acquire);
            }
            (*successor).locked.store(UNLOCKED, Ordering::Release);
            return;
        }

        (*next).locked.store(UNLOCKED, Ordering::Release);
    }

    /// Check whether the queue is currently non-empty.
    #[inline]
    pub fn is_locked(&self) -> bool {
        !self.tail.load(Ordering::Relaxed).is_null()
    }
}

unsafe impl<T: Send> Send for McsLock<T> {}
unsafe impl<T: Send> Sync for McsLock<T> {}

/// RAII guard for [`McsLock`]. Releases via the same node used to acquire.
pub struct McsLockGuard<'node, 'lock, T: ?Sized> {
    lock: &'lock McsLock<T>,
    node: &'node McsNode,
}

impl<T: ?Sized> Deref for McsLockGuard<'_, '_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for McsLockGuard<'_, '_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for McsLockGuard<'_, '_, T> {
    fn drop(&mut self) {
        unsafe { self.lock.unlock(self.node) };
    }
}
