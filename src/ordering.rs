//! Standard memory orderings for concurrent node access.
//!
//! These constants keep ordering usage consistent across the codebase and
//! make the intent clear at each access point.

use std::sync::atomic::Ordering;

/// Ordering for following forward links during lock-free traversal.
/// Pairs with the writer's Release stores.
pub(crate) const LINK_READ: Ordering = Ordering::Acquire;

/// Ordering for writing forward links under a predecessor lock.
/// Pairs with the reader's Acquire loads.
pub(crate) const LINK_WRITE: Ordering = Ordering::Release;

/// Ordering for reading the `inserted`/`deleted` flags.
/// Observing `inserted == true` must make all prior link writes visible.
pub(crate) const FLAG_READ: Ordering = Ordering::Acquire;

/// Ordering for publishing the `inserted`/`deleted` flags.
pub(crate) const FLAG_WRITE: Ordering = Ordering::Release;

/// Ordering for claiming a node's unlink job (read-modify-write).
pub(crate) const CLAIM: Ordering = Ordering::AcqRel;

/// Ordering for the element counter.
/// The count is loosely consistent; no synchronization piggybacks on it.
pub(crate) const COUNTER: Ordering = Ordering::Relaxed;
