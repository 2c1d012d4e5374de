//! Phase-fair reader-writer lock.
//!
//! Alternates between reader and writer phases so neither class waits
//! behind an unbounded queue of the other. Unlike
//! [`crate::rwlock`], which only ever prefers writers, this lock tracks
//! four separate fields so a writer can announce itself (`writers`),
//! close the reader gate (`read_phase`), drain existing readers, and only
//! then take `writer_active`, reopening the gate again on release.
//!
//! # Open question resolved
//!
//! The C source this is grounded on initializes `read_phase = 0`, which
//! read literally means no reader can enter until some writer has run
//! once (see `DESIGN.md`). This implementation initializes `read_phase =
//! 1` instead, so a freshly constructed lock admits readers immediately;
//! the more likely bootstrap behavior.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::AtomicU32;

use crate::backoff::Backoff;
use crate::pr;

const INACTIVE: u32 = 0;
const ACTIVE: u32 = 1;
const CLOSED: u32 = 0;
const OPEN: u32 = 1;

/// A phase-fair reader-writer lock guarding `T`.
#[repr(C)]
pub struct PfLock<T: ?Sized> {
    readers: AtomicU32,
    writers: AtomicU32,
    writer_active: AtomicU32,
    read_phase: AtomicU32,
    data: UnsafeCell<T>,
}

impl<T> PfLock<T> {
    /// Create a new unlocked lock. `read_phase` starts open (see module
    /// docs); every other counter starts at zero.
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            readers: AtomicU32::new(0),
            writers: AtomicU32::new(0),
            writer_active: AtomicU32::new(INACTIVE),
            read_phase: AtomicU32::new(OPEN),
            data: UnsafeCell::new(data),
        }
    }

    /// Try to acquire a read lock without spinning.
    ///
    /// Admits only while `writer_active = 0 ∧ read_phase = 1`, using the
    /// same CAS-and-verify double-check as [`crate::rwlock::RwLock`].
    #[inline]
    pub fn try_read(&self) -> Option<PfLockReadGuard<'_, T>> {
        if pr::load(&self.writer_active) != INACTIVE || pr::load(&self.read_phase) != OPEN {
            return None;
        }
        let old = pr::load(&self.readers);
        if pr::compare_and_swap_bool(&self.readers, old, old + 1) {
            if pr::load(&self.writer_active) == INACTIVE {
                return Some(PfLockReadGuard { lock: self });
            }
            pr::decrement(&self.readers);
        }
        None
    }

    /// Acquire a read lock, spinning if necessary.
    #[inline]
    pub fn read(&self) -> PfLockReadGuard<'_, T> {
        let mut backoff = Backoff::new();
        loop {
            if let Some(guard) = self.try_read() {
                return guard;
            }
            backoff.spin();
        }
    }

    /// Try to acquire a write lock without spinning.
    ///
    /// Claims `writer_active` with a single exchange, which by itself
    /// blocks new readers via [`PfLock::try_read`]'s check on the same
    /// field, then checks `readers`. If either step finds the lock
    /// already contended it undoes the claim and fails instead of
    /// spinning, the same double-check idiom as
    /// [`crate::rwlock::RwLock::try_write`].
    #[inline]
    pub fn try_write(&self) -> Option<PfLockWriteGuard<'_, T>> {
        if pr::exchange(&self.writer_active, ACTIVE) != INACTIVE {
            return None;
        }
        if pr::load(&self.readers) != 0 {
            pr::store_release(&self.writer_active, INACTIVE);
            return None;
        }
        Some(PfLockWriteGuard { lock: self })
    }

    /// Acquire a write lock, spinning as necessary.
    ///
    /// Announces intent (`writers += 1`), closes the reader gate
    /// (`read_phase = 0`), waits for already-admitted readers to drain,
    /// then claims `writer_active` and drops back out of the waiting
    /// count.
    #[inline]
    pub fn write(&self) -> PfLockWriteGuard<'_, T> {
        pr::increment(&self.writers);
        pr::store(&self.read_phase, CLOSED);

        let mut backoff = Backoff::new();
        while pr::load(&self.readers) != 0 {
            backoff.spin();
        }

        backoff.reset();
        while pr::exchange(&self.writer_active, ACTIVE) != INACTIVE {
            backoff.spin();
        }
        pr::decrement(&self.writers);

        PfLockWriteGuard { lock: self }
    }

    /// Number of readers currently admitted.
    #[inline]
    pub fn reader_count(&self) -> u32 {
        pr::load(&self.readers)
    }

    /// Check whether a writer currently holds the lock.
    #[inline]
    pub fn is_write_locked(&self) -> bool {
        pr::load(&self.writer_active) == ACTIVE
    }
}

unsafe impl<T: Send> Send for PfLock<T> {}
unsafe impl<T: Send + Sync> Sync for PfLock<T> {}

/// RAII read guard for [`PfLock`].
pub struct PfLockReadGuard<'a, T: ?Sized> {
    lock: &'a PfLock<T>,
}

impl<T: ?Sized> Deref for PfLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for PfLockReadGuard<'_, T> {
    fn drop(&mut self) {
        pr::decrement(&self.lock.readers);
    }
}

/// RAII write guard for [`PfLock`].
pub struct PfLockWriteGuard<'a, T: ?Sized> {
    lock: &'a PfLock<T>,
}

impl<T: ?Sized> Deref for PfLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for PfLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for PfLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        pr::store_release(&self.lock.writer_active, INACTIVE);
        pr::store(&self.lock.read_phase, OPEN);
    }
}
