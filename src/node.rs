//! Filepath: src/node.rs
//!
//! Skip-list node model.
//!
//! Every node carries a fixed tower of forward links, one exclusive lock,
//! and two published flags. Writers lock predecessors and mutate links;
//! readers follow links without locks and filter on the flags.
//!
//! # Per-Node State Machine
//!
//! `Unpublished -> Inserted -> LogicallyDeleted -> Unlinked`
//!
//! - `inserted` is set (Release) only after the node is spliced at every
//!   level of its tower. An Acquire read of `inserted == true` therefore
//!   observes every forward link.
//! - `deleted` is set (Release) under the node's own lock, exactly once.
//! - `unlink_claimed` is a claim token for the background unlink job so
//!   scheduling the same node twice stays idempotent.

use std::sync::atomic::{AtomicBool, AtomicPtr};

use parking_lot::{Mutex, MutexGuard};

use crate::ordering::{CLAIM, FLAG_READ, FLAG_WRITE, LINK_READ, LINK_WRITE};

/// Hard cap on tower height. Configured `max_levels` must not exceed this.
pub const MAX_LEVELS: usize = 64;

// ============================================================================
//  NodeKind
// ============================================================================

/// Role of a node in the list.
///
/// The head sentinel compares less than every priority and the tail
/// sentinel greater, so traversal never needs a null check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Head,
    Tail,
    Data,
}

// ============================================================================
//  Node
// ============================================================================

/// A skip-list node.
///
/// `key` and `priority` are `None` only on sentinels. The priority is
/// immutable after construction (priority changes are expressed as
/// delete + insert), which is what makes unlocked priority reads sound.
pub(crate) struct Node<K, P> {
    kind: NodeKind,
    key: Option<K>,
    priority: Option<P>,

    /// Forward links, one per level. Length fixed at construction; the
    /// tail sentinel has an empty tower because nothing follows it.
    next: Box<[AtomicPtr<Node<K, P>>]>,

    /// Exclusive, non-reentrant writer lock.
    lock: Mutex<()>,

    inserted: AtomicBool,
    deleted: AtomicBool,
    unlink_claimed: AtomicBool,
}

impl<K, P> Node<K, P> {
    /// Allocate a data node with the given tower height.
    ///
    /// The node starts unpublished: links null, `inserted` false.
    pub(crate) fn data(key: K, priority: P, height: usize) -> Box<Self> {
        debug_assert!((1..=MAX_LEVELS).contains(&height));

        Box::new(Self {
            kind: NodeKind::Data,
            key: Some(key),
            priority: Some(priority),
            next: Self::empty_tower(height),
            lock: Mutex::new(()),
            inserted: AtomicBool::new(false),
            deleted: AtomicBool::new(false),
            unlink_claimed: AtomicBool::new(false),
        })
    }

    /// Allocate the head sentinel with a full-height tower, every level
    /// pointing at `tail`.
    pub(crate) fn head(max_levels: usize, tail: *mut Self) -> Box<Self> {
        let next = (0..max_levels)
            .map(|_| AtomicPtr::new(tail))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Box::new(Self {
            kind: NodeKind::Head,
            key: None,
            priority: None,
            next,
            lock: Mutex::new(()),
            inserted: AtomicBool::new(true),
            deleted: AtomicBool::new(false),
            unlink_claimed: AtomicBool::new(false),
        })
    }

    /// Allocate the tail sentinel. Nothing follows it, so its tower is
    /// empty.
    pub(crate) fn tail() -> Box<Self> {
        Box::new(Self {
            kind: NodeKind::Tail,
            key: None,
            priority: None,
            next: Self::empty_tower(0),
            lock: Mutex::new(()),
            inserted: AtomicBool::new(true),
            deleted: AtomicBool::new(false),
            unlink_claimed: AtomicBool::new(false),
        })
    }

    fn empty_tower(height: usize) -> Box<[AtomicPtr<Self>]> {
        (0..height)
            .map(|_| AtomicPtr::new(std::ptr::null_mut()))
            .collect::<Vec<_>>()
            .into_boxed_slice()
    }

    // ========================================================================
    //  Accessors
    // ========================================================================

    #[inline]
    pub(crate) const fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    pub(crate) const fn is_data(&self) -> bool {
        matches!(self.kind, NodeKind::Data)
    }

    #[inline]
    pub(crate) const fn is_tail(&self) -> bool {
        matches!(self.kind, NodeKind::Tail)
    }

    /// Tower height. Level indices run `0..height()`.
    #[inline]
    pub(crate) fn height(&self) -> usize {
        self.next.len()
    }

    /// The node's key.
    ///
    /// # Panics
    /// Panics if called on a sentinel; callers check `is_data` first.
    #[inline]
    pub(crate) fn key(&self) -> &K {
        match &self.key {
            Some(key) => key,

            None => unreachable!("sentinel nodes carry no key"),
        }
    }

    /// The node's priority.
    ///
    /// # Panics
    /// Panics if called on a sentinel; callers check `is_data` first.
    #[inline]
    pub(crate) fn priority(&self) -> &P {
        match &self.priority {
            Some(priority) => priority,

            None => unreachable!("sentinel nodes carry no priority"),
        }
    }

    // ========================================================================
    //  Links
    // ========================================================================

    /// Load the forward link at `level` (Acquire).
    #[inline]
    pub(crate) fn next_ptr(&self, level: usize) -> *mut Self {
        self.next[level].load(LINK_READ)
    }

    /// Store the forward link at `level` (Release).
    ///
    /// Callers hold either exclusive ownership of an unpublished node or
    /// the lock of the node being written.
    #[inline]
    pub(crate) fn set_next(&self, level: usize, ptr: *mut Self) {
        self.next[level].store(ptr, LINK_WRITE);
    }

    // ========================================================================
    //  Flags
    // ========================================================================

    #[inline]
    pub(crate) fn is_inserted(&self) -> bool {
        self.inserted.load(FLAG_READ)
    }

    /// Publish the node. Must happen after the splice at every level.
    #[inline]
    pub(crate) fn set_inserted(&self) {
        self.inserted.store(true, FLAG_WRITE);
    }

    #[inline]
    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted.load(FLAG_READ)
    }

    /// Logically delete the node. Must happen under `self.lock`.
    #[inline]
    pub(crate) fn set_deleted(&self) {
        self.deleted.store(true, FLAG_WRITE);
    }

    /// Claim the right to physically unlink this node.
    ///
    /// Returns `true` if some earlier job already claimed it.
    #[inline]
    pub(crate) fn claim_unlink(&self) -> bool {
        self.unlink_claimed.swap(true, CLAIM)
    }

    // ========================================================================
    //  Lock
    // ========================================================================

    /// Acquire this node's exclusive lock.
    ///
    /// Lock discipline: operations acquire locks in descending list
    /// position (a remover locks its target before the target's
    /// predecessors; inserters lock predecessors bottom-up by level, which
    /// is also descending position). The lock is non-reentrant; callers
    /// that touch the same predecessor at several levels must not re-lock
    /// it.
    #[inline]
    #[must_use = "dropping the guard immediately releases the lock"]
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }
}

impl<K, P> std::fmt::Debug for Node<K, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("height", &self.height())
            .field("inserted", &self.inserted)
            .field("deleted", &self.deleted)
            .finish_non_exhaustive()
    }
}

// ============================================================================
//  Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_node_starts_unpublished() {
        let node: Box<Node<u64, u64>> = Node::data(1, 10, 4);
        assert_eq!(node.kind(), NodeKind::Data);
        assert_eq!(node.height(), 4);
        assert!(!node.is_inserted());
        assert!(!node.is_deleted());
        assert_eq!(*node.key(), 1);
        assert_eq!(*node.priority(), 10);
        for level in 0..4 {
            assert!(node.next_ptr(level).is_null());
        }
    }

    #[test]
    fn sentinels_are_published_and_towerless_tail() {
        let tail: Box<Node<u64, u64>> = Node::tail();
        let tail_ptr = Box::into_raw(tail);

        let head: Box<Node<u64, u64>> = Node::head(8, tail_ptr);
        assert_eq!(head.height(), 8);
        assert!(head.is_inserted());
        for level in 0..8 {
            assert_eq!(head.next_ptr(level), tail_ptr);
        }

        // SAFETY: tail_ptr was just created from Box::into_raw.
        let tail = unsafe { Box::from_raw(tail_ptr) };
        assert_eq!(tail.height(), 0);
        assert!(tail.is_tail());
    }

    #[test]
    fn unlink_claim_is_single_shot() {
        let node: Box<Node<u64, u64>> = Node::data(1, 10, 1);
        assert!(!node.claim_unlink());
        assert!(node.claim_unlink());
        assert!(node.claim_unlink());
    }
}
