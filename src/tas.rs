//! Test-and-set (TAS) spinlock.
//!
//! The simplest and fastest spinlock: a single atomic exchange loop. It is
//! unfair; any waiter may win a release race, so starvation is possible
//! under contention.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::AtomicU32;

use crate::backoff::Backoff;
use crate::pr;

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// A test-and-set spinlock guarding `T`.
#[repr(C)]
pub struct TasLock<T: ?Sized> {
    locked: AtomicU32,
    data: UnsafeCell<T>,
}

impl<T> TasLock<T> {
    /// Create a new unlocked lock. Leaves `locked` at zero, matching the
    /// zero-initialization contract every lock in this crate follows.
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicU32::new(UNLOCKED),
            data: UnsafeCell::new(data),
        }
    }

    /// Attempt to acquire without spinning: one exchange, success iff the
    /// prior value was unlocked.
    #[inline]
    pub fn try_lock(&self) -> Option<TasLockGuard<'_, T>> {
        if pr::exchange(&self.locked, LOCKED) == UNLOCKED {
            Some(TasLockGuard { lock: self })
        } else {
            None
        }
    }

    /// Acquire the lock, spinning with a pause hint between attempts.
    #[inline]
    pub fn lock(&self) -> TasLockGuard<'_, T> {
        let mut backoff = Backoff::new();
        while pr::exchange(&self.locked, LOCKED) != UNLOCKED {
            backoff.spin();
        }
        TasLockGuard { lock: self }
    }

    /// Check whether the lock is currently held.
    #[inline]
    pub fn is_locked(&self) -> bool {
        pr::load(&self.locked) == LOCKED
    }
}

unsafe impl<T: Send> Send for TasLock<T> {}
unsafe impl<T: Send> Sync for TasLock<T> {}

/// RAII guard for [`TasLock`].
pub struct TasLockGuard<'a, T: ?Sized> {
    lock: &'a TasLock<T>,
}

impl<T: ?Sized> Deref for TasLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for TasLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for TasLockGuard<'_, T> {
    fn drop(&mut self) {
        pr::store_release(&self.lock.locked, UNLOCKED);
    }
}
