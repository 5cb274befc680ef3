//! Error types surfaced by the queue.
//!
//! Internal validation failures are retried in place and never reach the
//! caller; only genuine user errors appear here.

use std::fmt as StdFmt;

/// Errors returned by queue construction and keyed operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A constructor argument was out of bounds.
    InvalidArgument(&'static str),

    /// `update` was called for a key that is absent or logically deleted.
    NotFoundOrDeleted,

    /// `update` would move a key onto a priority already held by another
    /// live key.
    PriorityOccupied,

    /// A background unlink job panicked. The list remains logically
    /// consistent; physical unlinking of some nodes may be stalled.
    OrchestratorFailed,
}

impl StdFmt::Display for Error {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::InvalidArgument(what) => write!(f, "invalid argument: {what}"),

            Self::NotFoundOrDeleted => write!(f, "key not found or already deleted"),

            Self::PriorityOccupied => {
                write!(f, "target priority is occupied by another live key")
            }

            Self::OrchestratorFailed => write!(f, "background unlink orchestrator failed"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(
            Error::InvalidArgument("max_levels must be in 1..=64").to_string(),
            "invalid argument: max_levels must be in 1..=64"
        );
        assert_eq!(
            Error::NotFoundOrDeleted.to_string(),
            "key not found or already deleted"
        );
    }
}
