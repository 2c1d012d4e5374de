//! Test-and-test-and-set (TATAS) spinlock.
//!
//! Same release protocol as [`crate::tas`], but `lock` first takes a
//! relaxed read of the flag before attempting the exchange.
//! Under contention this turns most spin iterations into a cache *share*
//! instead of an invalidation, which cuts coherence traffic at the cost
//! of one extra load per attempt.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::AtomicU32;

use crate::backoff::Backoff;
use crate::pr;

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// A test-and-test-and-set spinlock guarding `T`.
#[repr(C)]
pub struct TatasLock<T: ?Sized> {
    locked: AtomicU32,
    data: UnsafeCell<T>,
}

impl<T> TatasLock<T> {
    /// Create a new unlocked lock.
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicU32::new(UNLOCKED),
            data: UnsafeCell::new(data),
        }
    }

    /// Attempt to acquire without spinning.
    #[inline]
    pub fn try_lock(&self) -> Option<TatasLockGuard<'_, T>> {
        if pr::load(&self.locked) != UNLOCKED {
            return None;
        }
        if pr::exchange(&self.locked, LOCKED) == UNLOCKED {
            Some(TatasLockGuard { lock: self })
        } else {
            None
        }
    }

    /// Acquire the lock: relaxed-read the flag first, only attempt the
    /// exchange once it looks free.
    #[inline]
    pub fn lock(&self) -> TatasLockGuard<'_, T> {
        let mut backoff = Backoff::new();
        loop {
            if pr::load(&self.locked) == UNLOCKED && pr::exchange(&self.locked, LOCKED) == UNLOCKED
            {
                return TatasLockGuard { lock: self };
            }
            backoff.spin();
        }
    }

    /// Check whether the lock is currently held.
    #[inline]
    pub fn is_locked(&self) -> bool {
        pr::load(&self.locked) == LOCKED
    }
}

unsafe impl<T: Send> Send for TatasLock<T> {}
unsafe impl<T: Send> Sync for TatasLock<T> {}

/// RAII guard for [`TatasLock`].
pub struct TatasLockGuard<'a, T: ?Sized> {
    lock: &'a TatasLock<T>,
}

impl<T: ?Sized> Deref for TatasLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for TatasLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for TatasLockGuard<'_, T> {
    fn drop(&mut self) {
        pr::store_release(&self.lock.locked, UNLOCKED);
    }
}
