//! Lock-free locator.
//!
//! `weak_search` walks the list top-down and records the predecessor and
//! successor flanking the target priority at every level. It acquires no
//! locks and deliberately ignores logical state: it may return successors
//! that are not yet published or already logically deleted. Writers
//! re-validate under predecessor locks afterwards; readers filter on
//! `inserted && !deleted`.

use std::cmp::Ordering;
use std::ptr;

use seize::LocalGuard;

use super::{Compare, Inner};
use crate::node::{MAX_LEVELS, Node};

/// Per-level predecessors and successors around a target priority.
pub(crate) struct SearchOutcome<K, P> {
    /// Highest level at which a node of equal priority was observed as the
    /// successor, or `None` if no equal node was seen.
    pub(crate) level_found: Option<usize>,

    /// `preds[l]` compares strictly less than the target at level `l`.
    pub(crate) preds: [*mut Node<K, P>; MAX_LEVELS],

    /// `succs[l] == preds[l].next[l]` at observation time; compares
    /// greater than or equal to the target.
    pub(crate) succs: [*mut Node<K, P>; MAX_LEVELS],
}

impl<K, P, C> Inner<K, P, C>
where
    C: Compare<P>,
{
    /// Locate `target` without locking.
    ///
    /// Only indices `0..max_levels` of the returned arrays are meaningful.
    /// The guard pins every pointer recorded here for the caller's use.
    pub(crate) fn weak_search(&self, target: &P, _guard: &LocalGuard<'_>) -> SearchOutcome<K, P> {
        let mut outcome = SearchOutcome {
            level_found: None,
            preds: [ptr::null_mut(); MAX_LEVELS],
            succs: [ptr::null_mut(); MAX_LEVELS],
        };

        let mut pred: *mut Node<K, P> = self.head;

        for level in (0..self.config.max_levels).rev() {
            // SAFETY: pred is the head or a node observed under the guard.
            let mut curr: *mut Node<K, P> = unsafe { &*pred }.next_ptr(level);

            loop {
                match self.position_of(curr, target) {
                    Ordering::Less => {
                        pred = curr;
                        // SAFETY: curr is protected by the guard.
                        curr = unsafe { &*curr }.next_ptr(level);
                    }

                    position => {
                        if position == Ordering::Equal && outcome.level_found.is_none() {
                            outcome.level_found = Some(level);
                        }
                        break;
                    }
                }
            }

            outcome.preds[level] = pred;
            outcome.succs[level] = curr;
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, InlineOrchestrator, NaturalOrder, SkipQueue};
    use std::sync::Arc;

    fn inline_queue(max_levels: usize) -> SkipQueue<u64, u64> {
        SkipQueue::with_orchestrator(
            NaturalOrder,
            Config {
                max_levels,
                ..Config::default()
            },
            Arc::new(InlineOrchestrator),
        )
        .unwrap()
    }

    #[test]
    fn search_finds_present_priority_at_level_zero() {
        let queue = inline_queue(8);
        for value in [10u64, 20, 30] {
            assert!(queue.try_add(value, value));
        }

        let guard = queue.inner().guard();
        let outcome = queue.inner().weak_search(&20, &guard);
        assert!(outcome.level_found.is_some());

        // SAFETY: guard held; the node was just inserted.
        let node = unsafe { &*outcome.succs[0] };
        assert_eq!(*node.priority(), 20);
    }

    #[test]
    fn search_misses_absent_priority() {
        let queue = inline_queue(8);
        assert!(queue.try_add(10u64, 10u64));

        let guard = queue.inner().guard();
        let outcome = queue.inner().weak_search(&15, &guard);
        assert!(outcome.level_found.is_none());

        // Successor at level 0 is the next larger element or the tail.
        // SAFETY: guard held.
        let succ = unsafe { &*outcome.succs[0] };
        assert!(succ.is_tail());
    }

    #[test]
    fn search_predecessors_flank_target() {
        let queue = inline_queue(8);
        for value in [1u64, 3, 5, 7, 9] {
            assert!(queue.try_add(value, value));
        }

        let guard = queue.inner().guard();
        let outcome = queue.inner().weak_search(&6, &guard);

        // SAFETY: guard held.
        let pred = unsafe { &*outcome.preds[0] };
        let succ = unsafe { &*outcome.succs[0] };
        assert_eq!(*pred.priority(), 5);
        assert_eq!(*succ.priority(), 7);
    }
}
