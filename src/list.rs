//! Filepath: src/list.rs
//!
//! `SkipQueue` - a concurrent priority queue on a lazy skip list.
//!
//! Ordering is by priority through an injected comparator; uniqueness is
//! by key through a concurrent side index. Readers traverse forward links
//! without locks and filter on the published flags; writers lock the
//! affected predecessors, validate, and splice. Physical unlinking of
//! logically deleted nodes is deferred to the orchestrator.

use std::cmp::Ordering;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use dashmap::DashMap;
use seize::{Collector, LocalGuard};

use crate::error::Error;
use crate::level::LevelGenerator;
use crate::node::{MAX_LEVELS, Node, NodeKind};
use crate::ordering::COUNTER;
use crate::reclaim;
use crate::unlink::{BackgroundOrchestrator, Health, Orchestrator};

mod insert;
mod iter;
mod remove;
mod search;
mod validate;


#[cfg(test)]
pub(crate) mod test_hooks;

#[cfg(test)]
mod shuttle_tests;

pub use iter::Iter;
pub use validate::{debug_counters, reset_debug_counters};

// ============================================================================
//  Comparator
// ============================================================================

/// Total order over priorities.
///
/// Must be pure and cheap: it runs on every traversal step, without locks,
/// possibly from many threads at once.
pub trait Compare<P> {
    /// Compare two priorities.
    fn compare(&self, a: &P, b: &P) -> Ordering;
}

/// Orders priorities by their `Ord` instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaturalOrder;

impl<P: Ord> Compare<P> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &P, b: &P) -> Ordering {
        a.cmp(b)
    }
}

/// Adapts a comparison function into a [`Compare`] implementation.
///
/// ```
/// use skipq::{Config, OrderBy, SkipQueue};
///
/// // Largest priority drains first.
/// let queue = SkipQueue::with_comparator(
///     OrderBy(|a: &u32, b: &u32| b.cmp(a)),
///     Config::default(),
/// )
/// .unwrap();
/// assert!(queue.try_add("x", 1));
/// assert!(queue.try_add("y", 9));
/// assert_eq!(queue.try_remove_min(), Some("y"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct OrderBy<F>(pub F);

impl<P, F> Compare<P> for OrderBy<F>
where
    F: Fn(&P, &P) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &P, b: &P) -> Ordering {
        (self.0)(a, b)
    }
}

// ============================================================================
//  Config
// ============================================================================

/// Tunables fixed at construction.
#[derive(Debug, Clone)]
pub struct Config {
    /// Soft capacity bound. Inserting past it evicts the current minimum;
    /// the count may transiently overshoot but converges.
    pub max_size: usize,

    /// Tower height cap, `1..=MAX_LEVELS`. Sized for the expected element
    /// count: `log2(n)` levels suffice for `n` elements at the default
    /// promotion probability.
    pub max_levels: usize,

    /// Geometric promotion probability in `[0, 1]`.
    pub promotion_probability: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            max_levels: 32,
            promotion_probability: 0.5,
        }
    }
}

impl Config {
    fn validate(&self) -> Result<(), Error> {
        if self.max_levels == 0 || self.max_levels > MAX_LEVELS {
            return Err(Error::InvalidArgument("max_levels must be in 1..=64"));
        }

        // NaN fails the range check as well.
        if !(0.0..=1.0).contains(&self.promotion_probability) {
            return Err(Error::InvalidArgument(
                "promotion_probability must be within [0, 1]",
            ));
        }

        if self.max_size == 0 {
            return Err(Error::InvalidArgument("max_size must be nonzero"));
        }

        Ok(())
    }
}

// ============================================================================
//  Inner
// ============================================================================

/// Shared list state.
///
/// Held behind an `Arc` so background unlink jobs can keep the list alive
/// until they finish.
pub(crate) struct Inner<K, P, C> {
    head: *mut Node<K, P>,

    config: Config,
    comparator: C,
    levels: LevelGenerator,

    /// Live element count. Loosely consistent under concurrent mutation.
    count: AtomicUsize,

    /// Key -> priority side index backing the keyed operations. Ordering
    /// lives in the list; uniqueness lives here.
    index: DashMap<K, P>,

    collector: Collector,
    orchestrator: Arc<dyn Orchestrator>,
    health: Health,
}

// SAFETY: The raw sentinel pointers are owned by this structure and only
// dereferenced under the protocol documented in `node`: links are
// Acquire/Release atomics, mutation happens under per-node locks, and
// reclamation is deferred through seize.
unsafe impl<K: Send + Sync, P: Send + Sync, C: Send + Sync> Send for Inner<K, P, C> {}
unsafe impl<K: Send + Sync, P: Send + Sync, C: Send + Sync> Sync for Inner<K, P, C> {}

impl<K, P, C> Inner<K, P, C> {
    /// Enter a protected region and return a guard.
    ///
    /// Pointers loaded while the guard lives cannot be reclaimed under the
    /// reader.
    #[inline]
    pub(crate) fn guard(&self) -> LocalGuard<'_> {
        self.collector.enter()
    }
}

impl<K, P, C> Inner<K, P, C>
where
    K: Eq + Hash,
{
    fn new(comparator: C, config: Config, orchestrator: Arc<dyn Orchestrator>) -> Self {
        // The tail is reachable from every head link and freed by the
        // level-0 teardown walk, so no direct handle is kept.
        let tail: *mut Node<K, P> = Box::into_raw(Node::tail());
        let head: *mut Node<K, P> = Box::into_raw(Node::head(config.max_levels, tail));
        let levels = LevelGenerator::new(config.promotion_probability, config.max_levels);

        Self {
            head,
            config,
            comparator,
            levels,
            count: AtomicUsize::new(0),
            index: DashMap::new(),
            collector: Collector::new(),
            orchestrator,
            health: Health::default(),
        }
    }
}

impl<K, P, C> Inner<K, P, C>
where
    C: Compare<P>,
{
    /// Compare a node against a target priority, sentinels included.
    #[inline]
    fn position_of(&self, node: *mut Node<K, P>, target: &P) -> Ordering {
        // SAFETY: node is reachable under the caller's guard.
        let node = unsafe { &*node };
        match node.kind() {
            NodeKind::Head => Ordering::Less,

            NodeKind::Tail => Ordering::Greater,

            NodeKind::Data => self.comparator.compare(node.priority(), target),
        }
    }

    #[inline]
    fn priorities_equal(&self, a: &P, b: &P) -> bool {
        self.comparator.compare(a, b) == Ordering::Equal
    }
}

impl<K, P, C> Drop for Inner<K, P, C> {
    fn drop(&mut self) {
        // SAFETY: No other thread can reach the list (jobs hold an Arc and
        // have finished), so the remaining chain is exclusively ours.
        unsafe { reclaim::teardown_chain(self.head) };
    }
}

// ============================================================================
//  SkipQueue
// ============================================================================

/// A concurrent priority queue backed by a lazy skip list.
///
/// - `try_add` / `try_remove` / `try_remove_min` / `update` mutate under
///   per-node locks with bounded lock sets.
/// - `contains` / `get` / iteration are lock-free and never block writers.
/// - A soft capacity bound evicts the minimum element on overflow.
/// - Logically deleted nodes are physically unlinked by a background
///   orchestrator, off the writer's critical path.
///
/// Cloning the handle is cheap and shares the underlying list.
///
/// # Example
///
/// ```
/// use skipq::SkipQueue;
///
/// let queue: SkipQueue<&str, u64> = SkipQueue::new();
/// assert!(queue.try_add("low", 1));
/// assert!(queue.try_add("high", 9));
/// assert_eq!(queue.try_remove_min(), Some("low"));
/// ```
pub struct SkipQueue<K, P, C = NaturalOrder> {
    inner: Arc<Inner<K, P, C>>,
}

impl<K, P, C> Clone for SkipQueue<K, P, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, P> SkipQueue<K, P, NaturalOrder>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    P: Ord + Clone + Send + Sync + 'static,
{
    /// Create a queue with the default configuration, natural priority
    /// order, and a dedicated background unlink worker.
    #[must_use]
    pub fn new() -> Self {
        match Self::with_config(Config::default()) {
            Ok(queue) => queue,

            Err(_) => unreachable!("default configuration is valid"),
        }
    }

    /// Create a queue with natural priority order and a custom
    /// configuration.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] when the configuration is out of
    /// bounds.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        Self::with_comparator(NaturalOrder, config)
    }
}

impl<K, P> Default for SkipQueue<K, P, NaturalOrder>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    P: Ord + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, P, C> SkipQueue<K, P, C>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
    C: Compare<P> + Send + Sync + 'static,
{
    /// Create a queue with a custom comparator and a dedicated background
    /// unlink worker.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] when the configuration is out of
    /// bounds.
    pub fn with_comparator(comparator: C, config: Config) -> Result<Self, Error> {
        Self::with_orchestrator(comparator, config, Arc::new(BackgroundOrchestrator::new()))
    }

    /// Create a queue with every collaborator injected.
    ///
    /// The orchestrator runs deferred unlink jobs; pass
    /// [`crate::InlineOrchestrator`] for deterministic tests.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] when the configuration is out of
    /// bounds.
    pub fn with_orchestrator(
        comparator: C,
        config: Config,
        orchestrator: Arc<dyn Orchestrator>,
    ) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner::new(comparator, config, orchestrator)),
        })
    }

    // ========================================================================
    //  Lock-Free Reads
    // ========================================================================

    /// Whether `key` is currently present and published.
    ///
    /// Never blocks. Loosely consistent under concurrent mutation.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// The priority currently associated with `key`, if the key is present
    /// and published.
    ///
    /// Never blocks. Priorities are immutable per node, so the read needs
    /// no lock.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<P> {
        let priority: P = self.inner.index.get(key)?.value().clone();

        let guard = self.inner.guard();
        let search = self.inner.weak_search(&priority, &guard);
        search.level_found?;

        // SAFETY: protected by the guard.
        let node = unsafe { &*search.succs[0] };
        if node.is_data() && node.is_inserted() && !node.is_deleted() && node.key() == key {
            Some(node.priority().clone())
        } else {
            None
        }
    }

    /// Number of live elements.
    ///
    /// O(1); loosely consistent under concurrent mutation and may
    /// transiently exceed the configured capacity.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.count.load(COUNTER)
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configuration this queue was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    // ========================================================================
    //  Health
    // ========================================================================

    /// Health of the background unlink pipeline.
    ///
    /// # Errors
    /// Returns [`Error::OrchestratorFailed`] once any unlink job has
    /// panicked. The list stays logically consistent either way.
    pub fn health(&self) -> Result<(), Error> {
        self.inner.health.check()
    }

    /// Number of unlink jobs that have panicked.
    #[must_use]
    pub fn unlink_failures(&self) -> usize {
        self.inner.health.failure_count()
    }
}

#[cfg(test)]
impl<K, P, C> SkipQueue<K, P, C> {
    pub(crate) fn inner(&self) -> &Inner<K, P, C> {
        &self.inner
    }
}

impl<K, P, C> std::fmt::Debug for SkipQueue<K, P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkipQueue")
            .field("len", &self.inner.count)
            .field("max_size", &self.inner.config.max_size)
            .field("max_levels", &self.inner.config.max_levels)
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
    fn rejects_zero_levels() {
        let config = Config {
            max_levels: 0,
            ..Config::default()
        };
        let result: Result<SkipQueue<u64, u64>, _> = SkipQueue::with_config(config);
        assert_eq!(
            result.err(),
            Some(Error::InvalidArgument("max_levels must be in 1..=64"))
        );
    }

    #[test]
    fn rejects_oversized_levels() {
        let config = Config {
            max_levels: MAX_LEVELS + 1,
            ..Config::default()
        };
        let result: Result<SkipQueue<u64, u64>, _> = SkipQueue::with_config(config);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_probability_out_of_range() {
        for bad in [-0.1, 1.1, f64::NAN] {
            let config = Config {
                promotion_probability: bad,
                ..Config::default()
            };
            let result: Result<SkipQueue<u64, u64>, _> = SkipQueue::with_config(config);
            assert!(result.is_err(), "probability {bad} should be rejected");
        }
    }

    #[test]
    fn rejects_zero_capacity() {
        let config = Config {
            max_size: 0,
            ..Config::default()
        };
        let result: Result<SkipQueue<u64, u64>, _> = SkipQueue::with_config(config);
        assert!(result.is_err());
    }

    #[test]
    fn custom_comparator_orders_descending() {
        let queue = SkipQueue::with_comparator(
            OrderBy(|a: &u64, b: &u64| b.cmp(a)),
            Config::default(),
        )
        .unwrap();

        assert!(queue.try_add("a", 1u64));
        assert!(queue.try_add("b", 9u64));

        // Under a reversed comparator the "minimum" is the largest value.
        assert_eq!(queue.try_remove_min(), Some("b"));
        assert_eq!(queue.try_remove_min(), Some("a"));
        assert_eq!(queue.try_remove_min(), None);
    }
}
