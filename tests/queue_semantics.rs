//! Single-threaded semantic tests for `SkipQueue`.
//!
//! These pin down the externally observable contract: drain order,
//! capacity eviction, duplicate handling, update errors, and the
//! loosely-consistent read surface.

mod common;

use std::sync::Arc;

use skipq::{Config, Error, InlineOrchestrator, NaturalOrder, SkipQueue};

fn inline_queue<K, P>(config: Config) -> SkipQueue<K, P>
where
    K: Eq + std::hash::Hash + Clone + Send + Sync + 'static,
    P: Ord + Clone + Send + Sync + 'static,
{
    SkipQueue::with_orchestrator(NaturalOrder, config, Arc::new(InlineOrchestrator)).unwrap()
}

#[test]
fn drain_yields_priority_order() {
    common::init_tracing();
    let queue: SkipQueue<char, u32> = inline_queue(Config::default());

    assert!(queue.try_add('a', 3));
    assert!(queue.try_add('b', 1));
    assert!(queue.try_add('c', 2));

    assert_eq!(queue.try_remove_min(), Some('b'));
    assert_eq!(queue.try_remove_min(), Some('c'));
    assert_eq!(queue.try_remove_min(), Some('a'));
    assert_eq!(queue.try_remove_min(), None);

    queue.validate();
}

#[test]
fn capacity_two_keeps_top_two() {
    common::init_tracing();
    let queue: SkipQueue<char, u32> = inline_queue(Config {
        max_size: 2,
        ..Config::default()
    });

    assert!(queue.try_add('a', 5));
    assert!(queue.try_add('b', 1));
    assert!(queue.try_add('c', 3));

    assert_eq!(queue.len(), 2);
    assert_eq!(queue.get(&'c'), Some(3));
    assert_eq!(queue.get(&'a'), Some(5));
    assert!(!queue.contains(&'b'), "minimum-priority element evicted");

    queue.validate();
}

#[test]
fn add_remove_round_trip() {
    let queue: SkipQueue<u64, u64> = inline_queue(Config::default());

    assert!(queue.try_add(7, 70));
    assert!(queue.contains(&7));

    assert!(queue.try_remove(&7));
    assert!(!queue.contains(&7));

    assert!(queue.try_add(7, 71));
    assert!(!queue.try_add(7, 72), "second add of same key must fail");
    assert_eq!(queue.len(), 1);

    queue.validate();
}

#[test]
fn min_sequence_is_non_decreasing() {
    let queue: SkipQueue<u64, u64> = inline_queue(Config::default());

    // Insertion order deliberately scrambled.
    for value in [9u64, 2, 7, 1, 8, 3, 6, 0, 5, 4] {
        assert!(queue.try_add(value, value));
    }

    let mut last: Option<u64> = None;
    while let Some(key) = queue.try_remove_min() {
        if let Some(prev) = last {
            assert!(prev <= key, "min sequence regressed: {prev} then {key}");
        }
        last = Some(key);
    }

    assert!(queue.is_empty());
}

#[test]
fn update_reorders_element() {
    let queue: SkipQueue<&str, u32> = inline_queue(Config::default());

    assert!(queue.try_add("x", 10));
    assert!(queue.try_add("y", 20));

    // Push "x" above "y".
    queue.update(&"x", 30).unwrap();

    assert_eq!(queue.try_remove_min(), Some("y"));
    assert_eq!(queue.try_remove_min(), Some("x"));
}

#[test]
fn update_errors() {
    let queue: SkipQueue<&str, u32> = inline_queue(Config::default());

    assert_eq!(queue.update(&"missing", 1), Err(Error::NotFoundOrDeleted));

    assert!(queue.try_add("x", 10));
    assert!(queue.try_remove(&"x"));
    assert_eq!(queue.update(&"x", 1), Err(Error::NotFoundOrDeleted));

    assert!(queue.try_add("a", 1));
    assert!(queue.try_add("b", 2));
    assert_eq!(queue.update(&"a", 2), Err(Error::PriorityOccupied));
    assert_eq!(queue.get(&"a"), Some(1));
    assert_eq!(queue.get(&"b"), Some(2));
}

#[test]
fn enumeration_is_sorted_and_restartable() {
    let queue: SkipQueue<u64, u64> = inline_queue(Config::default());

    for value in [5u64, 1, 4, 2, 3] {
        assert!(queue.try_add(value, value));
    }

    let first: Vec<u64> = queue.iter().collect();
    assert_eq!(first, vec![1, 2, 3, 4, 5]);

    // Re-calling restarts the walk and reflects later mutation.
    assert!(queue.try_remove(&3));
    let second: Vec<u64> = queue.iter().collect();
    assert_eq!(second, vec![1, 2, 4, 5]);
}

#[test]
fn snapshot_carries_priorities() {
    let queue: SkipQueue<&str, u32> = inline_queue(Config::default());

    assert!(queue.try_add("mid", 2));
    assert!(queue.try_add("low", 1));
    assert!(queue.try_add("high", 3));

    assert_eq!(
        queue.to_vec(),
        vec![("low", 1), ("mid", 2), ("high", 3)]
    );
}

#[test]
fn len_tracks_mutations() {
    let queue: SkipQueue<u64, u64> = inline_queue(Config::default());
    assert!(queue.is_empty());

    for value in 0u64..100 {
        assert!(queue.try_add(value, value));
    }
    assert_eq!(queue.len(), 100);

    for value in 0u64..50 {
        assert!(queue.try_remove(&value));
    }
    assert_eq!(queue.len(), 50);

    while queue.try_remove_min().is_some() {}
    assert!(queue.is_empty());

    queue.validate();
}

#[test]
fn healthy_queue_reports_ok() {
    let queue: SkipQueue<u64, u64> = inline_queue(Config::default());
    assert!(queue.try_add(1, 1));
    assert!(queue.try_remove(&1));

    assert!(queue.health().is_ok());
    assert_eq!(queue.unlink_failures(), 0);
}

#[test]
fn background_orchestrator_converges() {
    // Same workload as above but with the default background worker:
    // logical results are identical, physical unlinking just lags.
    let queue: SkipQueue<u64, u64> = SkipQueue::new();

    for value in 0u64..500 {
        assert!(queue.try_add(value, value));
    }
    for value in (0u64..500).step_by(2) {
        assert!(queue.try_remove(&value));
    }

    assert_eq!(queue.len(), 250);
    for value in 0u64..500 {
        assert_eq!(queue.contains(&value), value % 2 == 1);
    }
}
