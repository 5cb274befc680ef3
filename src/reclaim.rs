//! Reclaim helpers for seize-based memory reclamation.
//!
//! Unlinked nodes cannot be freed immediately: lock-free readers may still
//! hold references obtained during traversal. The unlinker retires a node
//! through its guard after the level-0 unlink, and seize frees it once no
//! guard can reach it. Whatever is still linked when the list itself drops
//! is torn down with a plain level-0 walk.

use seize::Collector;

use crate::node::Node;

/// Reclaim a boxed node (seize callback).
///
/// # Safety
///
/// - `ptr` must point to a valid `Node<K, P>` allocated via `Box::into_raw`.
/// - Must only be called after seize determines it's safe (no readers).
pub(crate) unsafe fn reclaim_node_boxed<K, P>(ptr: *mut Node<K, P>, _collector: &Collector) {
    // SAFETY: Caller guarantees ptr is valid and from Box::into_raw.
    // Seize ensures no readers remain.
    unsafe { drop(Box::from_raw(ptr)) };
}

/// Free every node still reachable on level 0, head and tail included.
///
/// Nodes already retired through seize are no longer linked and are not
/// touched here; the collector frees them when it drops.
///
/// # Safety
///
/// - `head` must be the list's head sentinel, allocated via `Box::into_raw`.
/// - The list must be unreachable by any other thread.
pub(crate) unsafe fn teardown_chain<K, P>(head: *mut Node<K, P>) {
    let mut curr: *mut Node<K, P> = head;

    while !curr.is_null() {
        // SAFETY: curr came from Box::into_raw and is still linked.
        let next: *mut Node<K, P> = unsafe {
            if (*curr).height() > 0 {
                (*curr).next_ptr(0)
            } else {
                // The tail sentinel has no tower; it ends the walk.
                std::ptr::null_mut()
            }
        };

        // SAFETY: exclusive access, each node is freed exactly once.
        unsafe { drop(Box::from_raw(curr)) };
        curr = next;
    }
}
