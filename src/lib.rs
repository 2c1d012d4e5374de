//! # synclock-kit
//!
//! Portable mutual-exclusion and reader-writer spinlocks over a thin
//! atomic primitive layer.
//!
//! Every lock here is busy-spin: there is no OS-level parking, no
//! cancellation, and no timeout on acquire. That tradeoff buys bounded,
//! predictable latency for the algorithms with a progress guarantee
//! (ticket, Anderson, MCS, CLH), at the cost of wasted CPU under long
//! critical sections; pick the lock whose ordering policy matches what
//! you need and keep critical sections short.
//!
//! ## Module organization
//!
//! ### Foundation
//! - [`pr`]: atomic primitives and memory barriers
//! - [`backoff`]: exponential backoff for spin loops
//!
//! ### Mutex-family locks
//! - [`tas`]: test-and-set spinlock (simplest, unfair)
//! - [`tatas`]: test-and-test-and-set spinlock (relaxed-read gate)
//! - [`ticket`]: FIFO ticket lock
//! - [`anderson`]: array-based queue lock, bounded slot count
//! - [`mcs`]: MCS queue lock, caller-supplied nodes
//! - [`clh`]: CLH queue lock, caller-supplied nodes
//!
//! ### Reader-writer locks
//! - [`rwlock`]: writer-preferring reader-writer lock
//! - [`pflock`]: phase-fair reader-writer lock
//!
//! ## Choosing a lock
//!
//! TAS/TATAS are cheapest under low contention but can starve a waiter
//! indefinitely. Ticket, MCS, and CLH are all strictly FIFO; MCS and CLH
//! scale best under heavy contention because each waiter spins on its own
//! cache line, at the cost of a caller-supplied node per thread. Anderson
//! gives the same per-waiter cache line without node plumbing, at the
//! cost of a fixed, compile-time participant bound. Between the two RW
//! locks, prefer [`pflock`] unless you specifically want writer priority.

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

/// Atomic primitives and memory barriers.
pub mod pr;

/// Exponential backoff for contention management.
pub mod backoff;

/// Test-and-set spinlock.
pub mod tas;

/// Test-and-test-and-set spinlock.
pub mod tatas;

/// FIFO ticket lock.
pub mod ticket;

/// Array-based (Anderson) queue lock.
pub mod anderson;

/// MCS queue lock.
pub mod mcs;

/// CLH queue lock.
pub mod clh;

/// Writer-preferring reader-writer lock.
pub mod rwlock;

/// Phase-fair reader-writer lock.
pub mod pflock;
