//! Shuttle tests for the lazy-deletion protocol.
//!
//! Shuttle explores randomized thread schedules over a simplified model
//! of the lock-validate-delete path: contending removers must hand out
//! ownership of each element exactly once, mirroring the target lock +
//! `deleted` re-check in `try_remove`.
//!
//! Run with: `cargo test --lib list::shuttle_tests`

#![allow(clippy::needless_range_loop)]

use shuttle::sync::{Arc, Mutex};
use shuttle::thread;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const SLOTS: usize = 4;
const ITERATIONS: usize = 200;

/// Minimal stand-in for the list: each slot is one element with a lock
/// and a `deleted` flag, like one node's removal-relevant state.
struct ModelList {
    locks: Vec<Mutex<()>>,
    deleted: Vec<AtomicBool>,
    removals: AtomicUsize,
}

impl ModelList {
    fn new() -> Self {
        Self {
            locks: (0..SLOTS).map(|_| Mutex::new(())).collect(),
            deleted: (0..SLOTS).map(|_| AtomicBool::new(false)).collect(),
            removals: AtomicUsize::new(0),
        }
    }

    /// The remove protocol: lock the target, re-check `deleted`, claim.
    fn try_remove(&self, slot: usize) -> bool {
        if self.deleted[slot].load(Ordering::Acquire) {
            return false;
        }

        let guard = self.locks[slot].lock().unwrap();
        if self.deleted[slot].load(Ordering::Acquire) {
            drop(guard);
            return false;
        }

        self.deleted[slot].store(true, Ordering::Release);
        self.removals.fetch_add(1, Ordering::Relaxed);
        drop(guard);
        true
    }
}

#[test]
fn contending_removers_claim_each_slot_once() {
    shuttle::check_random(
        || {
            let list = Arc::new(ModelList::new());

            let handles: Vec<_> = (0..3)
                .map(|_| {
                    let list = Arc::clone(&list);
                    thread::spawn(move || {
                        let mut claimed = 0usize;
                        for slot in 0..SLOTS {
                            if list.try_remove(slot) {
                                claimed += 1;
                            }
                        }
                        claimed
                    })
                })
                .collect();

            let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

            // Every slot is removed exactly once across all threads.
            assert_eq!(total, SLOTS);
            assert_eq!(list.removals.load(Ordering::Relaxed), SLOTS);
        },
        ITERATIONS,
    );
}

#[test]
fn removal_is_idempotent_per_slot() {
    shuttle::check_random(
        || {
            let list = Arc::new(ModelList::new());

            let first = {
                let list = Arc::clone(&list);
                thread::spawn(move || list.try_remove(0))
            };
            let second = {
                let list = Arc::clone(&list);
                thread::spawn(move || list.try_remove(0))
            };

            let wins =
                usize::from(first.join().unwrap()) + usize::from(second.join().unwrap());
            assert_eq!(wins, 1, "exactly one remover may own the slot");
        },
        ITERATIONS,
    );
}
