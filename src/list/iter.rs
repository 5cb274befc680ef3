//! Lock-free iteration over the bottom level.
//!
//! Iterators walk `next[0]` from the head, skipping unpublished and
//! logically deleted nodes. They are not snapshots: elements inserted or
//! removed mid-walk may or may not be observed, which is the documented
//! consistency level for enumeration.

use seize::LocalGuard;

use super::{Compare, SkipQueue};
use crate::node::Node;

/// Lazy iterator over keys in ascending priority order.
///
/// Holds a reclamation guard for its whole lifetime, so long-lived
/// iterators delay memory reclamation; re-create the iterator to restart.
pub struct Iter<'g, K, P> {
    _guard: LocalGuard<'g>,
    curr: *mut Node<K, P>,
}

impl<K, P> Iterator for Iter<'_, K, P>
where
    K: Clone,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        loop {
            // SAFETY: curr was reached by following links under the guard.
            let node = unsafe { &*self.curr };
            if node.is_tail() {
                return None;
            }

            self.curr = node.next_ptr(0);

            if node.is_inserted() && !node.is_deleted() {
                return Some(node.key().clone());
            }
        }
    }
}

impl<K, P> std::iter::FusedIterator for Iter<'_, K, P> where K: Clone {}

impl<K, P, C> SkipQueue<K, P, C>
where
    K: Eq + std::hash::Hash + Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
    C: Compare<P> + Send + Sync + 'static,
{
    /// Iterate over keys in current level-0 (ascending priority) order.
    ///
    /// Never blocks and tolerates concurrent mutation; not a snapshot.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, P> {
        let guard = self.inner.guard();
        // SAFETY: head is always valid.
        let first: *mut Node<K, P> = unsafe { &*self.inner.head }.next_ptr(0);

        Iter {
            _guard: guard,
            curr: first,
        }
    }

    /// Collect a best-effort `(key, priority)` snapshot in ascending
    /// priority order.
    ///
    /// Like iteration, this is loosely consistent under concurrent
    /// mutation.
    #[must_use]
    pub fn to_vec(&self) -> Vec<(K, P)> {
        let guard = self.inner.guard();
        let mut entries: Vec<(K, P)> = Vec::new();

        // SAFETY: head is always valid; the walk is pinned by the guard.
        let mut curr: *mut Node<K, P> = unsafe { &*self.inner.head }.next_ptr(0);
        loop {
            let node = unsafe { &*curr };
            if node.is_tail() {
                break;
            }
            if node.is_inserted() && !node.is_deleted() {
                entries.push((node.key().clone(), node.priority().clone()));
            }
            curr = node.next_ptr(0);
        }

        drop(guard);
        entries
    }
}
