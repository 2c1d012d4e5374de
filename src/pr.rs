//! Atomic primitives and memory barriers.
//!
//! This module provides the portable atomic primitive layer every lock in
//! the crate is built on: relaxed load/store, acquire/release load/store,
//! exchange, compare-and-swap, fetch-and-add/sub/and/or, increment/
//! decrement, full/read/write barriers, and a CPU pause hint.
//!
//! # Platform policy
//!
//! One implementation for every target: each function names the
//! `Ordering` it needs and lets the compiler lower it to whatever that
//! target requires, a plain load on strongly-ordered hardware, a true
//! load-acquire sequence on weakly-ordered hardware, and so on. In
//! particular [`barrier_r`] always requests `Ordering::Acquire`, never a
//! bare [`compiler_fence`], so it stays a real barrier on targets that
//! need one instead of silently degrading everywhere.
//!
//! # Failure model
//!
//! No operation here can fail: everything is wait-free at the hardware
//! level, same as the locks built on top of it spin rather than error.

use core::sync::atomic::{compiler_fence, fence, AtomicU32, Ordering};

/// CPU pause hint for spin loops.
///
/// Reduces pipeline resource use and memory traffic while spinning;
/// lowers to `pause` on x86 and `yield` on aarch64.
#[inline(always)]
pub fn cpu_pause() {
    core::hint::spin_loop();
}

/// Relaxed load.
#[inline(always)]
pub fn load(cell: &AtomicU32) -> u32 {
    cell.load(Ordering::Relaxed)
}

/// Relaxed store.
#[inline(always)]
pub fn store(cell: &AtomicU32, value: u32) {
    cell.store(value, Ordering::Relaxed);
}

/// Acquire load.
#[inline(always)]
pub fn load_acquire(cell: &AtomicU32) -> u32 {
    cell.load(Ordering::Acquire)
}

/// Release store.
#[inline(always)]
pub fn store_release(cell: &AtomicU32, value: u32) {
    cell.store(value, Ordering::Release);
}

/// Atomic exchange (acquire-release). Returns the prior value.
#[inline(always)]
pub fn exchange(cell: &AtomicU32, value: u32) -> u32 {
    cell.swap(value, Ordering::AcqRel)
}

/// Compare-and-swap. Returns the value observed in `cell` before the
/// attempt: on success this equals `expected`, on failure it is the
/// actual prior value.
#[inline(always)]
pub fn compare_and_swap(cell: &AtomicU32, expected: u32, desired: u32) -> u32 {
    match cell.compare_exchange(expected, desired, Ordering::AcqRel, Ordering::Acquire) {
        Ok(prior) => prior,
        Err(prior) => prior,
    }
}

/// Compare-and-swap. Returns whether the swap was performed.
#[inline(always)]
pub fn compare_and_swap_bool(cell: &AtomicU32, expected: u32, desired: u32) -> bool {
    cell.compare_exchange(expected, desired, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

/// Fetch-and-add. Returns the prior value.
#[inline(always)]
pub fn fetch_add(cell: &AtomicU32, delta: u32) -> u32 {
    cell.fetch_add(delta, Ordering::AcqRel)
}

/// Fetch-and-subtract. Returns the prior value.
#[inline(always)]
pub fn fetch_sub(cell: &AtomicU32, delta: u32) -> u32 {
    cell.fetch_sub(delta, Ordering::AcqRel)
}

/// Fetch-and-and. Returns the prior value.
#[inline(always)]
pub fn fetch_and(cell: &AtomicU32, mask: u32) -> u32 {
    cell.fetch_and(mask, Ordering::AcqRel)
}

/// Fetch-and-or. Returns the prior value.
#[inline(always)]
pub fn fetch_or(cell: &AtomicU32, mask: u32) -> u32 {
    cell.fetch_or(mask, Ordering::AcqRel)
}

/// Atomic increment. Returns the new value.
#[inline(always)]
pub fn increment(cell: &AtomicU32) -> u32 {
    fetch_add(cell, 1).wrapping_add(1)
}

/// Atomic decrement. Returns the new value.
#[inline(always)]
pub fn decrement(cell: &AtomicU32) -> u32 {
    fetch_sub(cell, 1).wrapping_sub(1)
}

/// Full (sequentially consistent) memory fence.
#[inline(always)]
pub fn barrier_full() {
    fence(Ordering::SeqCst);
}

/// Read (load-load) memory fence.
///
/// Must not collapse to a bare compiler barrier on weakly-ordered
/// hardware; `Ordering::Acquire` gives the right strength on both
/// backends described in the module docs.
#[inline(always)]
pub fn barrier_r() {
    fence(Ordering::Acquire);
}

/// Write (store-store) memory fence.
#[inline(always)]
pub fn barrier_w() {
    fence(Ordering::Release);
}

/// Compiler-only barrier: prevents reordering by the compiler without
/// emitting a hardware fence. Used on strongly-ordered hardware where
/// acquire/release need no instruction beyond ordinary loads/stores.
#[inline(always)]
pub fn barrier_compiler() {
    compiler_fence(Ordering::SeqCst);
}
