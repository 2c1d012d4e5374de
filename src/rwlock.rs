//! Writer-preferring reader-writer lock.
//!
//! Multiple readers may hold the lock concurrently, or a single writer
//! may hold it exclusively. A pending writer blocks new readers from
//! entering; under continuous writer arrival, readers can
//! starve. That is intentional, not a bug: document it at any API
//! boundary that builds on this lock.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::AtomicU32;

use crate::backoff::Backoff;
use crate::pr;

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// A writer-preferring reader-writer lock guarding `T`.
#[repr(C)]
pub struct RwLock<T: ?Sized> {
    readers: AtomicU32,
    writer: AtomicU32,
    data: UnsafeCell<T>,
}

impl<T> RwLock<T> {
    /// Create a new unlocked lock. Both counters start at zero.
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            readers: AtomicU32::new(0),
            writer: AtomicU32::new(UNLOCKED),
            data: UnsafeCell::new(data),
        }
    }

    /// Try to acquire a read lock without spinning.
    ///
    /// Snapshots `readers`, CASes it up by one only while no writer is
    /// present, then re-checks `writer`; if one appeared in the gap
    /// between the CAS and the re-check, backs off by decrementing
    /// `readers` again and fails. This double-check window is what makes
    /// the lock writer-preferring.
    #[inline]
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
        if pr::load(&self.writer) != UNLOCKED {
            return None;
        }
        let old = pr::load(&self.readers);
        if pr::compare_and_swap_bool(&self.readers, old, old + 1) {
            if pr::load(&self.writer) == UNLOCKED {
                return Some(RwLockReadGuard { lock: self });
            }
            pr::decrement(&self.readers);
        }
        None
    }

    /// Acquire a read lock, spinning if necessary.
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        let mut backoff = Backoff::new();
        loop {
            if let Some(guard) = self.try_read() {
                return guard;
            }
            backoff.spin();
        }
    }

    /// Try to acquire a write lock without spinning.
    #[inline]
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
        if pr::exchange(&self.writer, LOCKED) != UNLOCKED {
            return None;
        }
        if pr::load(&self.readers) != 0 {
            pr::store_release(&self.writer, UNLOCKED);
            return None;
        }
        Some(RwLockWriteGuard { lock: self })
    }

    /// Acquire a write lock, spinning if necessary.
    ///
    /// First claims the writer slot with an `exchange` loop (blocking any
    /// further readers from entering via [`RwLock::read`]'s double-check),
    /// then spins until the readers already in the critical section
    /// drain.
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        let mut backoff = Backoff::new();
        while pr::exchange(&self.writer, LOCKED) != UNLOCKED {
            backoff.spin();
        }
        backoff.reset();
        while pr::load(&self.readers) != 0 {
            backoff.spin();
        }
        RwLockWriteGuard { lock: self }
    }

    /// Check whether the lock is currently held for writing.
    #[inline]
    pub fn is_locked_exclusive(&self) -> bool {
        pr::load(&self.writer) != UNLOCKED
    }

    /// Current reader count.
    #[inline]
    pub fn reader_count(&self) -> u32 {
        pr::load(&self.readers)
    }
}

unsafe impl<T: Send> Send for RwLock<T> {}
unsafe impl<T: Send + Sync> Sync for RwLock<T> {}

/// RAII read guard for [`RwLock`].
pub struct RwLockReadGuard<'a, T: ?Sized> {
    lock: &'a RwLock<T>,
}

impl<T: ?Sized> Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for RwLockReadGuard<'_, T> {
    fn drop(&mut self) {
        pr::decrement(&self.lock.readers);
    }
}

/// RAII write guard for [`RwLock`].
pub struct RwLockWriteGuard<'a, T: ?Sized> {
    lock: &'a RwLock<T>,
}

impl<T: ?Sized> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for RwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for RwLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        pr::store_release(&self.lock.writer, UNLOCKED);
    }
}
