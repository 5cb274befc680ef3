//! Failure-injection hooks for tests.
//!
//! The hooks are thread-local so parallel tests cannot poison each
//! other; an inline orchestrator runs its jobs on the scheduling thread,
//! which is exactly where a test flips the hook.

use std::cell::Cell;

thread_local! {
    static FAIL_UNLINK: Cell<bool> = const { Cell::new(false) };
}

/// Make the next unlink jobs on this thread panic before touching the
/// list.
pub(crate) fn set_fail_unlink(enabled: bool) {
    FAIL_UNLINK.with(|flag| flag.set(enabled));
}

pub(crate) fn fail_unlink() -> bool {
    FAIL_UNLINK.with(Cell::get)
}
