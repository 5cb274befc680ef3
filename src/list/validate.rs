//! Invariant checks and contention diagnostics.
//!
//! `validate` is a quiescent checker: it assumes no in-flight operations
//! and panics with a description on the first violated invariant. The
//! stress suite calls it after joining all workers. The debug counters
//! are global, cheap, and loosely consistent; they exist to make retry
//! storms visible in tests without enabling tracing.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use super::{Compare, SkipQueue};
use crate::node::Node;

// ============================================================================
//  Debug Counters
// ============================================================================

static INSERT_RETRIES: AtomicU64 = AtomicU64::new(0);
static REMOVE_RETRIES: AtomicU64 = AtomicU64::new(0);
static UNLINK_RESCANS: AtomicU64 = AtomicU64::new(0);

#[inline]
pub(crate) fn note_insert_retry() {
    INSERT_RETRIES.fetch_add(1, AtomicOrdering::Relaxed);
}

#[inline]
pub(crate) fn note_remove_retry() {
    REMOVE_RETRIES.fetch_add(1, AtomicOrdering::Relaxed);
}

#[inline]
pub(crate) fn note_unlink_rescan() {
    UNLINK_RESCANS.fetch_add(1, AtomicOrdering::Relaxed);
}

/// Snapshot of `(insert_retries, remove_retries, unlink_rescans)` across
/// every queue in the process.
#[must_use]
pub fn debug_counters() -> (u64, u64, u64) {
    (
        INSERT_RETRIES.load(AtomicOrdering::Relaxed),
        REMOVE_RETRIES.load(AtomicOrdering::Relaxed),
        UNLINK_RESCANS.load(AtomicOrdering::Relaxed),
    )
}

/// Reset all debug counters to zero.
pub fn reset_debug_counters() {
    INSERT_RETRIES.store(0, AtomicOrdering::Relaxed);
    REMOVE_RETRIES.store(0, AtomicOrdering::Relaxed);
    UNLINK_RESCANS.store(0, AtomicOrdering::Relaxed);
}

// ============================================================================
//  Invariant Checker
// ============================================================================

impl<K, P, C> SkipQueue<K, P, C>
where
    K: Eq + std::hash::Hash + Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
    C: Compare<P> + Send + Sync + 'static,
{
    /// Check the structural invariants, panicking on the first violation.
    ///
    /// Must only be called at quiescence: no in-flight public operations.
    /// Deferred unlink jobs may still be draining — top-down unlinking
    /// cannot produce a false positive here — but a mid-splice insert
    /// can.
    ///
    /// Checked:
    /// - every level is sorted non-decreasing over published, non-deleted
    ///   nodes, with no equal-priority pair;
    /// - the nodes linked at level `l + 1` are a subset of level `l`;
    /// - the count matches the number of live nodes and respects the
    ///   capacity bound;
    /// - every live node is backed by its key-index entry.
    ///
    /// # Panics
    /// Panics with a description of the first violated invariant.
    pub fn validate(&self) {
        let inner = &*self.inner;
        let guard = inner.guard();
        let max_levels: usize = inner.config.max_levels;

        let mut structural: Vec<HashSet<usize>> = Vec::with_capacity(max_levels);
        let mut live_at_level0: usize = 0;

        for level in 0..max_levels {
            let mut linked: HashSet<usize> = HashSet::new();
            let mut prev_live: Option<*mut Node<K, P>> = None;

            // SAFETY: the walk follows links under the guard.
            let mut curr: *mut Node<K, P> = unsafe { &*inner.head }.next_ptr(level);
            loop {
                let node = unsafe { &*curr };
                if node.is_tail() {
                    break;
                }

                assert!(
                    node.height() > level,
                    "node linked at level {level} has tower height {}",
                    node.height()
                );
                linked.insert(curr.addr());

                if node.is_inserted() && !node.is_deleted() {
                    if let Some(prev) = prev_live {
                        let prev_node = unsafe { &*prev };
                        let order = inner
                            .comparator
                            .compare(prev_node.priority(), node.priority());
                        assert!(
                            order != Ordering::Greater,
                            "level {level} is out of order"
                        );
                        assert!(
                            order != Ordering::Equal,
                            "level {level} holds two live nodes of equal priority"
                        );
                    }
                    prev_live = Some(curr);

                    if level == 0 {
                        live_at_level0 += 1;
                    }
                }

                curr = node.next_ptr(level);
            }

            structural.push(linked);
        }

        for level in 1..max_levels {
            for node in &structural[level] {
                assert!(
                    structural[level - 1].contains(node),
                    "level {level} is not a subset of level {}",
                    level - 1
                );
            }
        }

        let count: usize = self.len();
        assert_eq!(
            count, live_at_level0,
            "count {count} does not match {live_at_level0} live nodes"
        );
        assert!(
            count <= inner.config.max_size,
            "count {count} exceeds capacity {} at quiescence",
            inner.config.max_size
        );

        // Every live node must be reachable through the key index.
        // SAFETY: the walk follows links under the guard.
        let mut curr: *mut Node<K, P> = unsafe { &*inner.head }.next_ptr(0);
        loop {
            let node = unsafe { &*curr };
            if node.is_tail() {
                break;
            }
            if node.is_inserted() && !node.is_deleted() {
                let indexed = inner
                    .index
                    .get(node.key())
                    .is_some_and(|entry| inner.priorities_equal(entry.value(), node.priority()));
                assert!(indexed, "live node missing from the key index");
            }
            curr = node.next_ptr(0);
        }

        drop(guard);
    }
}
