//! Filepath: src/list/remove.rs
//!
//! Logical deletion and deferred physical unlinking.
//!
//! Removal is two-phase. The removing thread sets `deleted` under the
//! target's own lock (winning the race for ownership), validates the
//! predecessor chain, and schedules an unlink job. The job relocates the
//! node's predecessor at every level from the top down, relinks under that
//! predecessor's lock, and retires the node through seize after the
//! level-0 unlink. Unlinking top-down keeps each level a subset of the
//! level below it at every intermediate step.

use std::cmp::Ordering;
use std::hint;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;

use parking_lot::MutexGuard;
use seize::{Guard, LocalGuard};

use super::validate::{note_remove_retry, note_unlink_rescan};
use super::{Compare, Inner, SkipQueue};
use crate::error::Error;
use crate::node::Node;
use crate::ordering::COUNTER;
use crate::reclaim;
use crate::tracing_helpers::{error_log, trace_log};

/// Raw node pointer that may cross into an orchestrator job.
struct NodePtr<K, P>(*mut Node<K, P>);

// SAFETY: The pointee is shared list state; all access from the job goes
// through the same atomics/locks as on the scheduling thread.
unsafe impl<K: Send + Sync, P: Send + Sync> Send for NodePtr<K, P> {}

impl<K, P, C> SkipQueue<K, P, C>
where
    K: Eq + std::hash::Hash + Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
    C: Compare<P> + Send + Sync + 'static,
{
    /// Remove `key` if it is present and published.
    ///
    /// Returns `false` when the key is absent, not yet published, or
    /// already logically deleted by another thread.
    pub fn try_remove(&self, key: &K) -> bool {
        let priority: P = match self.inner.index.get(key) {
            Some(entry) => entry.value().clone(),

            None => return false,
        };

        let guard = self.inner.guard();
        match Inner::remove_node(&self.inner, &priority, Some(key), &guard) {
            Some(removed) => {
                self.inner
                    .index
                    .remove_if(&removed, |_, stored| self.inner.priorities_equal(stored, &priority));
                true
            }

            None => false,
        }
    }

    /// Remove and return the key of the minimum-priority element.
    ///
    /// Returns `None` when the queue holds no published element. Under a
    /// single thread the sequence of returned keys is non-decreasing by
    /// priority.
    pub fn try_remove_min(&self) -> Option<K> {
        let guard = self.inner.guard();

        'restart: loop {
            // SAFETY: head is always valid; everything reached below is
            // pinned by the guard.
            let mut curr: *mut Node<K, P> = unsafe { &*self.inner.head }.next_ptr(0);

            let candidate = loop {
                let node = unsafe { &*curr };
                if node.is_tail() {
                    return None;
                }
                if node.is_deleted() {
                    // Logically gone; its unlink may still be in flight.
                    curr = node.next_ptr(0);
                    continue;
                }
                if !node.is_inserted() {
                    // Mid-insert at the front; give the inserter a moment.
                    hint::spin_loop();
                    continue 'restart;
                }
                break node;
            };

            let candidate_guard = candidate.lock();
            if candidate.is_deleted() {
                drop(candidate_guard);
                note_remove_retry();
                continue 'restart;
            }

            candidate.set_deleted();
            let key: K = candidate.key().clone();
            let priority: P = candidate.priority().clone();

            self.inner.count.fetch_sub(1, COUNTER);
            drop(candidate_guard);
            Inner::schedule_unlink(&self.inner, ptr::from_ref(candidate).cast_mut());

            self.inner
                .index
                .remove_if(&key, |_, stored| self.inner.priorities_equal(stored, &priority));

            trace_log!("removed minimum");
            return Some(key);
        }
    }

    // ========================================================================
    //  Update (delete + insert)
    // ========================================================================

    /// Re-prioritize `key` to `new_priority`.
    ///
    /// Implemented as logical delete plus insert so node priorities stay
    /// immutable and the ordering invariant cannot be violated in place.
    /// There is a brief window during which the key is absent.
    ///
    /// # Errors
    /// - [`Error::NotFoundOrDeleted`] when the key is absent, unpublished,
    ///   or already deleted.
    /// - [`Error::PriorityOccupied`] when another live key holds an equal
    ///   priority; the old entry is reinstated best-effort.
    pub fn update(&self, key: &K, new_priority: P) -> Result<(), Error> {
        self.update_with(key, move |_, _| new_priority)
    }

    /// Re-prioritize `key` using a function of its current priority.
    ///
    /// # Errors
    /// Same as [`SkipQueue::update`].
    pub fn update_with<F>(&self, key: &K, rebuild: F) -> Result<(), Error>
    where
        F: FnOnce(&K, &P) -> P,
    {
        let old: P = match self.inner.index.get(key) {
            Some(entry) => entry.value().clone(),

            None => return Err(Error::NotFoundOrDeleted),
        };
        let new_priority: P = rebuild(key, &old);

        let guard = self.inner.guard();

        if Inner::remove_node(&self.inner, &old, Some(key), &guard).is_none() {
            return Err(Error::NotFoundOrDeleted);
        }

        if self
            .inner
            .insert_node(key.clone(), new_priority.clone(), &guard)
            .is_some()
        {
            self.inner.index.insert(key.clone(), new_priority);
            return Ok(());
        }

        // The new priority is held by another live key. Reinstate the old
        // entry; if even that slot got taken meanwhile, drop the key.
        if self.inner.insert_node(key.clone(), old.clone(), &guard).is_some() {
            self.inner.index.insert(key.clone(), old);
        } else {
            self.inner
                .index
                .remove_if(key, |_, stored| self.inner.priorities_equal(stored, &old));
        }
        Err(Error::PriorityOccupied)
    }
}

impl<K, P, C> Inner<K, P, C>
where
    K: Eq + Clone,
    C: Compare<P>,
{
    /// Logically delete the node holding `priority`.
    ///
    /// When `expected_key` is given, the node must also carry that key
    /// (guards against a stale index entry). Returns the removed key, or
    /// `None` when there is nothing to remove.
    pub(super) fn remove_node(
        self_: &Arc<Self>,
        priority: &P,
        expected_key: Option<&K>,
        guard: &LocalGuard<'_>,
    ) -> Option<K>
    where
        K: Send + Sync + 'static,
        P: Send + Sync + 'static,
        C: Send + Sync + 'static,
    {
        let this: &Self = self_;

        let mut search = this.weak_search(priority, guard);
        let target: *mut Node<K, P> = search.succs[0];

        // SAFETY: pinned by the guard. `level_found` may be stale, so the
        // successor itself decides whether the priority is present.
        let target_ref = unsafe { &*target };
        if !target_ref.is_data() || !this.priorities_equal(target_ref.priority(), priority) {
            return None;
        }
        if !target_ref.is_inserted() || target_ref.is_deleted() {
            return None;
        }
        if let Some(expected) = expected_key {
            if target_ref.key() != expected {
                return None;
            }
        }

        let target_guard = target_ref.lock();
        if target_ref.is_deleted() {
            drop(target_guard);
            return None;
        }

        // Ownership: we are the only thread that saw this transition.
        target_ref.set_deleted();
        let height: usize = target_ref.height();

        loop {
            let mut locks: Vec<MutexGuard<'_, ()>> = Vec::with_capacity(height);
            let mut last_locked: *mut Node<K, P> = ptr::null_mut();
            let mut valid = true;

            for level in 0..height {
                let pred = search.preds[level];
                if pred != last_locked {
                    // SAFETY: pinned by the guard.
                    locks.push(unsafe { &*pred }.lock());
                    last_locked = pred;
                }

                // SAFETY: pinned by the guard.
                let pred_ref = unsafe { &*pred };
                if pred_ref.is_deleted() || pred_ref.next_ptr(level) != target {
                    valid = false;
                    break;
                }
            }

            if valid {
                this.count.fetch_sub(1, COUNTER);
                let key: K = target_ref.key().clone();

                // Unlock before scheduling: an inline orchestrator runs
                // the job on this thread, and the job locks these same
                // predecessors.
                drop(locks);
                drop(target_guard);
                Self::schedule_unlink(self_, target);

                trace_log!(height, "logically deleted node");
                return Some(key);
            }

            // Predecessors moved; `deleted` stays set, relocate and retry.
            drop(locks);
            note_remove_retry();
            search = this.weak_search(priority, guard);
        }
    }
}

impl<K, P, C> Inner<K, P, C>
where
    K: Send + Sync + 'static,
    P: Send + Sync + 'static,
    C: Compare<P> + Send + Sync + 'static,
{
    /// Hand the node to the orchestrator for physical unlinking.
    ///
    /// Safe to call multiple times for the same node: the job claims the
    /// node before touching the list, so duplicates are no-ops. The job
    /// holds an `Arc` to the list, keeping it alive until the unlink
    /// completes.
    pub(super) fn schedule_unlink(self_: &Arc<Self>, node: *mut Node<K, P>) {
        let inner = Arc::clone(self_);
        let target = NodePtr(node);

        self_.orchestrator.run(Box::new(move || {
            let target = target;
            let NodePtr(ptr) = target;
            if panic::catch_unwind(AssertUnwindSafe(|| inner.unlink_node(ptr))).is_err() {
                inner.health.record_failure();
                error_log!("background unlink job panicked");
            }
        }));
    }

    /// Physically unlink a logically deleted node, top level down to 0,
    /// then retire it through seize.
    pub(super) fn unlink_node(&self, node: *mut Node<K, P>) {
        #[cfg(test)]
        if super::test_hooks::fail_unlink() {
            panic!("injected unlink failure");
        }

        // SAFETY: the scheduling job's Arc keeps the list alive, and the
        // node cannot be retired before this claim succeeds.
        let node_ref = unsafe { &*node };
        if node_ref.claim_unlink() {
            return;
        }
        debug_assert!(node_ref.is_deleted(), "unlink scheduled before logical delete");

        let guard = self.guard();
        for level in (0..node_ref.height()).rev() {
            self.unlink_level(node, level);
            trace_log!(level, "unlinked node at level");
        }

        // SAFETY: the node is unreachable from every level; readers that
        // already hold it are protected until their guards drop.
        unsafe { guard.defer_retire(node, reclaim::reclaim_node_boxed::<K, P>) };
    }

    /// Unlink `node` from a single level.
    ///
    /// The predecessor recorded at schedule time may be long gone, so the
    /// walk always restarts from the head at this level.
    fn unlink_level(&self, node: *mut Node<K, P>, level: usize) {
        // SAFETY: the node is claimed by this job and not yet retired.
        let target_priority: &P = unsafe { &*node }.priority();

        'rescan: loop {
            let mut pred: *mut Node<K, P> = self.head;

            loop {
                // SAFETY: pred is the head or a node observed via the
                // guard entered by `unlink_node`.
                let curr: *mut Node<K, P> = unsafe { &*pred }.next_ptr(level);
                if curr == node {
                    break;
                }

                // SAFETY: as above.
                let curr_ref = unsafe { &*curr };
                if curr_ref.is_tail()
                    || self.comparator.compare(curr_ref.priority(), target_priority)
                        == Ordering::Greater
                {
                    // Already off this level.
                    return;
                }
                pred = curr;
            }

            // SAFETY: pred is pinned; lock and re-validate before relinking.
            let pred_ref = unsafe { &*pred };
            let pred_guard = pred_ref.lock();

            if pred_ref.is_deleted() || pred_ref.next_ptr(level) != node {
                drop(pred_guard);
                note_unlink_rescan();
                continue 'rescan;
            }

            // SAFETY: node is claimed by this job; its links are frozen
            // because no writer passes validation against a deleted node.
            pred_ref.set_next(level, unsafe { &*node }.next_ptr(level));
            drop(pred_guard);
            return;
        }
    }
}
