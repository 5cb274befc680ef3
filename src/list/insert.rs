//! Filepath: src/list/insert.rs
//!
//! The `try_add` protocol.
//!
//! 1. Claim the key in the side index (uniqueness is by key).
//! 2. `weak_search` for the priority; an equal published node means
//!    duplicate, an equal logically deleted node means retry until the
//!    orchestrator clears it.
//! 3. Lock predecessors bottom-up, skipping re-locks of a repeated
//!    predecessor, and validate `pred.next[l] == succ` with neither end
//!    deleted.
//! 4. Write the new node's links, fence, splice at every level, publish
//!    `inserted`.
//! 5. After the locks are released, evict the minimum if the soft
//!    capacity was exceeded.

use std::hint;
use std::ptr;
use std::sync::atomic;

use dashmap::mapref::entry::Entry;
use parking_lot::MutexGuard;
use seize::LocalGuard;

use super::validate::note_insert_retry;
use super::{Compare, Inner, SkipQueue};
use crate::node::Node;
use crate::ordering::{COUNTER, LINK_WRITE};
use crate::tracing_helpers::{debug_log, trace_log};

impl<K, P, C> SkipQueue<K, P, C>
where
    K: Eq + std::hash::Hash + Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
    C: Compare<P> + Send + Sync + 'static,
{
    /// Insert `key` with `priority`.
    ///
    /// Returns `false` without modifying the queue when the key is already
    /// present or when another live key holds an equal priority. Once this
    /// returns `true` the element is visible to `contains` from this
    /// thread (and to any thread that observes the insertion).
    pub fn try_add(&self, key: K, priority: P) -> bool {
        // Claim the key first; losing the splice rolls this back.
        match self.inner.index.entry(key.clone()) {
            Entry::Occupied(_) => return false,

            Entry::Vacant(slot) => {
                slot.insert(priority.clone());
            }
        }

        let guard = self.inner.guard();
        match self.inner.insert_node(key.clone(), priority.clone(), &guard) {
            Some(new_count) => {
                if new_count > self.inner.config.max_size {
                    // Soft bound: evict the minimum outside the insert's
                    // critical section. The overshoot is transient.
                    debug_log!(new_count, "capacity exceeded, evicting minimum");
                    let _ = self.try_remove_min();
                }
                true
            }

            None => {
                self.inner
                    .index
                    .remove_if(&key, |_, stored| self.inner.priorities_equal(stored, &priority));
                false
            }
        }
    }
}

impl<K, P, C> Inner<K, P, C>
where
    C: Compare<P>,
{
    /// Splice a new node for `(key, priority)` into the list.
    ///
    /// Returns the post-insert count on success, `None` when a published
    /// node with an equal priority already exists.
    pub(super) fn insert_node(
        &self,
        key: K,
        priority: P,
        guard: &LocalGuard<'_>,
    ) -> Option<usize> {
        let height: usize = self.levels.height();
        let node: Box<Node<K, P>> = Node::data(key, priority, height);

        loop {
            let search = self.weak_search(node.priority(), guard);

            // `level_found` may be stale (the equal node can be unlinked
            // while the search descends); trust only a re-checked succ.
            if search.level_found.is_some() {
                // SAFETY: protected by the guard.
                let existing = unsafe { &*search.succs[0] };

                if existing.is_data()
                    && self.priorities_equal(existing.priority(), node.priority())
                {
                    if !existing.is_deleted() {
                        // Equal priority already (being) inserted: wait for
                        // its publication so a subsequent read sees it,
                        // then report the duplicate.
                        while !existing.is_inserted() {
                            hint::spin_loop();
                        }
                        return None;
                    }

                    // Equal node is logically deleted; its unlink is
                    // already scheduled. Retry once it has left our splice
                    // window.
                    note_insert_retry();
                    std::thread::yield_now();
                    continue;
                }
            }

            let mut locks: Vec<MutexGuard<'_, ()>> = Vec::with_capacity(height);
            let mut last_locked: *mut Node<K, P> = ptr::null_mut();
            let mut valid = true;

            for level in 0..height {
                let pred = search.preds[level];
                let succ = search.succs[level];

                if pred != last_locked {
                    // SAFETY: pred is pinned by the guard.
                    locks.push(unsafe { &*pred }.lock());
                    last_locked = pred;
                }

                // SAFETY: both ends are pinned by the guard.
                let pred_ref = unsafe { &*pred };
                let succ_ref = unsafe { &*succ };

                if pred_ref.is_deleted()
                    || succ_ref.is_deleted()
                    || pred_ref.next_ptr(level) != succ
                {
                    valid = false;
                    break;
                }
            }

            if !valid {
                drop(locks);
                note_insert_retry();
                continue;
            }

            for level in 0..height {
                node.set_next(level, search.succs[level]);
            }

            let raw: *mut Node<K, P> = Box::into_raw(node);

            // All of the node's links must be visible before any splice
            // publishes the node at a level.
            atomic::fence(LINK_WRITE);

            for level in 0..height {
                // SAFETY: pred is locked and validated for this level.
                unsafe { &*search.preds[level] }.set_next(level, raw);
            }

            // SAFETY: raw was just created; publication makes the links
            // above visible to any reader that observes the flag.
            unsafe { &*raw }.set_inserted();

            let new_count: usize = self.count.fetch_add(1, COUNTER) + 1;
            drop(locks);

            trace_log!(height, new_count, "spliced new node");
            return Some(new_count);
        }
    }
}
