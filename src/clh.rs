//! CLH queue lock (Craig, Landin, and Hagersten).
//!
//! Like [`crate::mcs`], a linked queue giving FIFO ordering, but the
//! predecessor link is discovered by the acquirer rather than published
//! by the predecessor: a thread spins on *its predecessor's*
//! `locked` flag instead of its own. This is the one lock in the crate
//! that allocates: the lock itself owns a dummy tail node from
//! construction onward, and a thread's node, once released, may still be
//! observed by its successor, so the API hands back the (now free)
//! predecessor node from `release` for the caller to rotate into the next
//! `acquire` call, rather than leaking the two-node rotation as an
//! unstated caller convention.

use alloc::boxed::Box;
use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use crate::backoff::Backoff;

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// A queue node for [`ClhLock`].
///
/// Nodes rotate between "mine to submit" and "my predecessor's, now
/// free to reuse", see [`ClhLock::acquire`] and [`ClhLock::release`].
#[repr(C)]
pub struct ClhNode {
    locked: AtomicU32,
}

impl ClhNode {
    /// Create a fresh node, initially marked unlocked.
    #[inline]
    pub const fn new() -> Self {
        Self {
            locked: AtomicU32::new(UNLOCKED),
        }
    }
}

impl Default for ClhNode {
    fn default() -> Self {
        Self::new()
    }
}

/// A CLH queue lock guarding `T`.
///
/// `tail` is never null after construction: `new` allocates and publishes
/// an initial dummy node whose `locked` flag is already clear, per spec
/// §3 and §9.
#[repr(C)]
pub struct ClhLock<T: ?Sized> {
    tail: AtomicPtr<ClhNode>,
    data: UnsafeCell<T>,
}

impl<T> ClhLock<T> {
    /// Create a new unlocked lock, allocating the initial dummy node.
    #[inline]
    pub fn new(data: T) -> Self {
        let dummy = Box::into_raw(Box::new(ClhNode::new()));
        Self {
            tail: AtomicPtr::new(dummy),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquire the lock, submitting `node` as the new tail.
    ///
    /// Marks `node` locked, swaps it in as `tail`, then spins on the
    /// predecessor's `locked` flag. Returns a guard that, on release,
    /// hands back the predecessor node (now unreachable from anywhere
    /// else and safe to reuse) instead of `node` itself, since `node` may
    /// still be observed by whichever thread queues up behind it.
    #[inline]
    pub fn acquire(&self, node: Box<ClhNode>) -> ClhGuard<'_, T> {
        node.locked.store(LOCKED, Ordering::Relaxed);
        let node_ptr = Box::into_raw(node);
        let prev = self.tail.swap(node_ptr, Ordering::AcqRel);

        let mut backoff = Backoff::new();
        while unsafe { (*prev).locked.load(Ordering::Acquire) } != UNLOCKED {
            backoff.spin();
        }

        ClhGuard {
            lock: self,
            node: node_ptr,
            prev,
        }
    }

    /// Try to acquire without spinning, submitting `node` as the new tail.
    ///
    /// Snapshots the current tail and checks its `locked` flag; if it
    /// isn't clear the lock is held or contended and this fails
    /// immediately, handing `node` back unused. Otherwise it CASes `tail`
    /// from that snapshot to `node`, succeeding only if no other acquirer
    /// raced in between.
    #[inline]
    pub fn try_lock(&self, node: Box<ClhNode>) -> Result<ClhGuard<'_, T>, Box<ClhNode>> {
        let tail = self.tail.load(Ordering::Acquire);
        if unsafe { (*tail).locked.load(Ordering::Acquire) } != UNLOCKED {
            return Err(node);
        }

        node.locked.store(LOCKED, Ordering::Relaxed);
        let node_ptr = Box::into_raw(node);
        match self
            .tail
            .compare_exchange(tail, node_ptr, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(prev) => Ok(ClhGuard {
                lock: self,
                node: node_ptr,
                prev,
            }),
            Err(_) => Err(unsafe { Box::from_raw(node_ptr) }),
        }
    }

    /// Check whether the lock is currently contended or held.
    ///
    /// Best-effort: true once at least one node beyond the initial dummy
    /// has been submitted and not yet released.
    #[inline]
    pub fn is_locked(&self) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        unsafe { (*tail).locked.load(Ordering::Relaxed) == LOCKED }
    }
}

unsafe impl<T: Send> Send for ClhLock<T> {}
unsafe impl<T: Send> Sync for ClhLock<T> {}

impl<T: ?Sized> Drop for ClhLock<T> {
    fn drop(&mut self) {
        let tail = *self.tail.get_mut();
        unsafe { drop(Box::from_raw(tail)) };
    }
}

/// RAII guard for [`ClhLock`].
///
/// Plain `Drop` releases the lock but cannot hand the freed predecessor
/// node back to the caller, so it leaks that allocation. Call
/// [`ClhGuard::release`] instead to reclaim the predecessor node for the
/// next acquisition.
pub struct ClhGuard<'a, T: ?Sized> {
    lock: &'a ClhLock<T>,
    node: *mut ClhNode,
    prev: *mut ClhNode,
}

impl<T: ?Sized> ClhGuard<'_, T> {
    /// Release the lock, returning the predecessor node so the caller can
    /// reuse it on the next [`ClhLock::acquire`] call. The successor
    /// spins on `self.node`'s `locked` flag, so releasing still means
    /// clearing that flag, exactly as plain `Drop` does; what `release`
    /// adds is handing back the predecessor node, which is now
    /// unreachable from the queue and safe to reuse, instead of leaking
    /// it.
    #[inline]
    pub fn release(self) -> Box<ClhNode> {
        let node = self.node;
        let prev = self.prev;
        core::mem::forget(self);
        unsafe {
            (*node).locked.store(UNLOCKED, Ordering::Release);
            Box::from_raw(prev)
        }
    }
}

impl<T: ?Sized> Deref for ClhGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for ClhGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for ClhGuard<'_, T> {
    fn drop(&mut self) {
        unsafe {
            (*self.node).locked.store(UNLOCKED, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_unlocked() {
        let lock = ClhLock::new(42);
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_lock_unlock_round_trip() {
        let lock = ClhLock::new(42);
        let node = Box::new(ClhNode::new());
        let guard = lock.acquire(node);
        assert_eq!(*guard, 42);
        let _reusable = guard.release();
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_node_rotation_across_acquisitions() {
        let lock = ClhLock::new(0);
        let mut node = Box::new(ClhNode::new());
        for _ in 0..5 {
            let mut guard = lock.acquire(node);
            *guard += 1;
            node = guard.release();
        }
        let guard = lock.acquire(node);
        assert_eq!(*guard, 5);
    }

    #[test]
    fn test_try_lock_on_fresh_lock_succeeds() {
        let lock = ClhLock::new(42);
        let guard = lock.try_lock(Box::new(ClhNode::new()));
        assert!(guard.is_ok());
        assert_eq!(*guard.ok().unwrap(), 42);
    }

    #[test]
    fn test_try_lock_fails_while_held_and_returns_node() {
        let lock = ClhLock::new(0);
        let _held = lock.acquire(Box::new(ClhNode::new()));
        let result = lock.try_lock(Box::new(ClhNode::new()));
        assert!(result.is_err());
    }

    #[test]
    fn test_drop_without_explicit_release_still_unlocks() {
        let lock = ClhLock::new(7);
        {
            let guard = lock.acquire(Box::new(ClhNode::new()));
            assert_eq!(*guard, 7);
        }
        let guard = lock.acquire(Box::new(ClhNode::new()));
        assert_eq!(*guard, 7);
    }
}
