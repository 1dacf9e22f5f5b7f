//! Debug assertion macros for reader invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`); zero overhead
//! in release builds.

// =============================================================================
// INV-READ-01: Staging Stays Bounded
// =============================================================================

/// Assert that the staged batch never exceeds the configured hint.
///
/// **Invariant**: `staged.len() <= batch_hint`
///
/// Used in: `ChannelReader::poll_next()` after draining the view
macro_rules! debug_assert_batch_bounded {
    ($staged:expr, $hint:expr) => {
        debug_assert!(
            $staged <= $hint,
            "INV-READ-01 violated: staged {} responses exceeds batch hint {}",
            $staged,
            $hint
        )
    };
}

// =============================================================================
// INV-READ-02: Drain Before End-Of-Stream
// =============================================================================

/// Assert that the stream only ends once nothing remains deliverable.
///
/// **Invariant**: `finished → backlog == 0` before yielding `None`
///
/// Used in: `ChannelReader::poll_next()` on the end-of-stream path
macro_rules! debug_assert_drained_before_end {
    ($backlog:expr) => {
        debug_assert!(
            $backlog == 0,
            "INV-READ-02 violated: ending stream with {} data entries still queued",
            $backlog
        )
    };
}

// =============================================================================
// INV-READ-03: Close Releases Staged Buffers
// =============================================================================

/// Assert that a processed close left no staged responses behind.
///
/// **Invariant**: `on_close_channel → staged.is_empty()`
///
/// Used in: `ChannelReader::on_close_channel()`
macro_rules! debug_assert_staged_cleared {
    ($staged_empty:expr) => {
        debug_assert!(
            $staged_empty,
            "INV-READ-03 violated: close left staged responses holding buffers"
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_batch_bounded;
pub(crate) use debug_assert_drained_before_end;
pub(crate) use debug_assert_staged_cleared;
