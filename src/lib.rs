//! # skipq
//!
//! A concurrent priority queue built on a lazy skip list.
//!
//! `skipq` is the ordering/eviction primitive of an in-process cache:
//! elements carry a caller-supplied priority, the minimum is evicted when
//! a soft capacity bound is exceeded, and every operation is safe to call
//! from many threads at once.
//!
//! ## Design
//!
//! - **Lock-free reads.** `contains`, `get`, and iteration traverse
//!   forward links without locking and filter on per-node published
//!   flags.
//! - **Fine-grained writes.** `try_add` and `try_remove` lock only the
//!   handful of predecessor nodes they touch, validate, and splice.
//! - **Lazy deletion.** Removal marks a node `deleted` under its own
//!   lock; the physical relink runs later on an injected orchestrator, so
//!   writer critical sections stay short.
//! - **Deferred reclamation.** Unlinked nodes are retired through
//!   [`seize`] and freed only once no reader can still hold them.
//!
//! ## Example
//!
//! ```
//! use skipq::{Config, SkipQueue};
//!
//! let queue: SkipQueue<&str, u32> = SkipQueue::with_config(Config {
//!     max_size: 2,
//!     ..Config::default()
//! })
//! .unwrap();
//!
//! assert!(queue.try_add("a", 5));
//! assert!(queue.try_add("b", 1));
//! assert!(queue.try_add("c", 3));
//!
//! // Capacity is 2: the minimum ("b") was evicted.
//! assert!(!queue.contains(&"b"));
//! assert_eq!(queue.len(), 2);
//! ```

mod error;
mod level;
mod list;
mod node;
mod ordering;
mod reclaim;
mod tracing_helpers;
mod unlink;

pub use error::Error;
pub use list::{
    Compare, Config, Iter, NaturalOrder, OrderBy, SkipQueue, debug_counters,
    reset_debug_counters,
};
pub use node::MAX_LEVELS;
pub use unlink::{BackgroundOrchestrator, InlineOrchestrator, Job, Orchestrator};
