//! Multi-threaded correctness properties for every lock in the crate.
//!
//! These live outside `src/` because they need real OS threads
//! (`std::thread`), while the library itself stays `#![no_std]`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use synclock_kit::anderson::AndersonLock;
use synclock_kit::clh::{ClhLock, ClhNode};
use synclock_kit::mcs::{McsLock, McsNode};
use synclock_kit::pflock::PfLock;
use synclock_kit::rwlock::RwLock;
use synclock_kit::tas::TasLock;
use synclock_kit::tatas::TatasLock;
use synclock_kit::ticket::TicketLock;

const THREADS: usize = 8;
const ITERATIONS: usize = 100_000;

#[test]
fn tas_mutual_exclusion_counter() {
    let lock = Arc::new(TasLock::new(0u64));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                for _ in 0..ITERATIONS {
                    *lock.lock() += 1;
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*lock.lock(), (THREADS * ITERATIONS) as u64);
}

#[test]
fn tatas_mutual_exclusion_counter() {
    let lock = Arc::new(TatasLock::new(0u64));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                for _ in 0..ITERATIONS {
                    *lock.lock() += 1;
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*lock.lock(), (THREADS * ITERATIONS) as u64);
}

#[test]
fn ticket_lock_mutual_exclusion_counter() {
    let lock = Arc::new(TicketLock::new(0u64));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                for _ in 0..ITERATIONS {
                    *lock.lock() += 1;
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*lock.lock(), (THREADS * ITERATIONS) as u64);
}

#[test]
fn ticket_lock_fifo_arrival_order() {
    // Threads record the order their ticket-granting fetch_add observed
    // versus the order they actually entered the critical section.
    let lock = Arc::new(TicketLock::new(Vec::<usize>::new()));
    let barrier = Arc::new(std::sync::Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|id| {
            let lock = Arc::clone(&lock);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                lock.lock().push(id);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let order = lock.lock();
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(*sorted, vec![0, 1, 2, 3]);
}

#[test]
fn anderson_lock_mutual_exclusion_counter() {
    let lock: Arc<AndersonLock<u64, 16>> = Arc::new(AndersonLock::new(0));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                for _ in 0..ITERATIONS {
                    *lock.lock() += 1;
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*lock.lock(), (THREADS * ITERATIONS) as u64);
}

#[test]
fn mcs_lock_mutual_exclusion_counter() {
    let lock = Arc::new(McsLock::new(0u64));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                let node = McsNode::new();
                for _ in 0..ITERATIONS {
                    let mut guard = unsafe { lock.lock(&node) };
                    *guard += 1;
                    *guard *= 2;
                    *guard /= 2;
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let node = McsNode::new();
    let guard = unsafe { lock.lock(&node) };
    assert_eq!(*guard, (THREADS * ITERATIONS) as u64);
}

#[test]
fn clh_lock_mutual_exclusion_counter() {
    let lock = Arc::new(ClhLock::new(0u64));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                let mut node = Box::new(ClhNode::new());
                for _ in 0..ITERATIONS {
                    let mut guard = lock.acquire(node);
                    *guard += 1;
                    node = guard.release();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let guard = lock.acquire(Box::new(ClhNode::new()));
    assert_eq!(*guard, (THREADS * ITERATIONS) as u64);
}

#[test]
fn rwlock_never_observes_reader_and_writer_together() {
    let lock = Arc::new(RwLock::new(0u64));
    let violation = Arc::new(AtomicBool::new(false));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let lock = Arc::clone(&lock);
        let violation = Arc::clone(&violation);
        handles.push(thread::spawn(move || {
            for _ in 0..2_000 {
                let guard = lock.read();
                let _ = *guard;
                drop(guard);
            }
            let _ = violation;
        }));
    }
    for _ in 0..4 {
        let lock = Arc::clone(&lock);
        let violation = Arc::clone(&violation);
        handles.push(thread::spawn(move || {
            for _ in 0..2_000 {
                let mut guard = lock.write();
                if lock.reader_count() != 0 {
                    violation.store(true, Ordering::SeqCst);
                }
                *guard += 1;
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    assert!(!violation.load(Ordering::SeqCst));
}

#[test]
fn rwlock_allows_concurrent_readers() {
    let lock = Arc::new(RwLock::new(0u64));
    let max_concurrent = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let concurrent = Arc::new(std::sync::atomic::AtomicU32::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let max_concurrent = Arc::clone(&max_concurrent);
            let concurrent = Arc::clone(&concurrent);
            thread::spawn(move || {
                let guard = lock.read();
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                max_concurrent.fetch_max(now, Ordering::SeqCst);
                thread::yield_now();
                concurrent.fetch_sub(1, Ordering::SeqCst);
                drop(guard);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert!(max_concurrent.load(Ordering::SeqCst) >= 2);
}

#[test]
fn pflock_never_observes_reader_and_writer_together() {
    let lock = Arc::new(PfLock::new(0u64));
    let violation = Arc::new(AtomicBool::new(false));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let lock = Arc::clone(&lock);
        handles.push(thread::spawn(move || {
            for _ in 0..2_000 {
                let guard = lock.read();
                let _ = *guard;
                drop(guard);
            }
        }));
    }
    for _ in 0..4 {
        let lock = Arc::clone(&lock);
        let violation = Arc::clone(&violation);
        handles.push(thread::spawn(move || {
            for _ in 0..2_000 {
                let mut guard = lock.write();
                if lock.reader_count() != 0 {
                    violation.store(true, Ordering::SeqCst);
                }
                *guard += 1;
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    assert!(!violation.load(Ordering::SeqCst));
}

#[test]
fn try_then_release_then_acquire_from_another_thread_succeeds() {
    let lock = Arc::new(TasLock::new(0u64));
    let guard = lock.try_lock().expect("fresh lock must be acquirable");
    drop(guard);

    let lock2 = Arc::clone(&lock);
    let handle = thread::spawn(move || lock2.try_lock().is_some());
    assert!(handle.join().unwrap());
}
