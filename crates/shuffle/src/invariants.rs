//! Debug assertion macros for exchange invariants.
//!
//! These macros provide runtime checks for the structural invariants of the
//! pool and subpartition queue. They are only active in debug builds
//! (`#[cfg(debug_assertions)]`), so there is zero overhead in release builds.

// =============================================================================
// INV-POOL-01: Segment Conservation
// =============================================================================

/// Assert that every segment is accounted for as either free or leased.
///
/// **Invariant**: `free + leased == total_segments`
///
/// Used in: `PoolState` mutation paths (acquire, recycle, resize, destroy)
macro_rules! debug_assert_pool_accounting {
    ($free:expr, $leased:expr, $total:expr) => {
        debug_assert!(
            $free + $leased == $total,
            "INV-POOL-01 violated: free {} + leased {} != total {}",
            $free,
            $leased,
            $total
        )
    };
}

// =============================================================================
// INV-QUEUE-01: Priority Prefix
// =============================================================================

/// Assert that priority events form a contiguous prefix of the queue.
///
/// **Invariant**: `entries[0..priority_len]` are all priority events and
/// `entries[priority_len..]` are all data.
///
/// Used in: `add_priority_event()` after the splice, `poll()` after a pop
macro_rules! debug_assert_priority_prefix {
    ($prefix_ok:expr, $priority_len:expr) => {
        debug_assert!(
            $prefix_ok,
            "INV-QUEUE-01 violated: priority prefix of length {} is not contiguous",
            $priority_len
        )
    };
}

// =============================================================================
// INV-QUEUE-02: Lane Ordering
// =============================================================================

/// Assert that delivery within one lane (data or priority) is in ascending
/// submission order.
///
/// **Invariant**: per lane, `next_sequence > last_delivered_sequence`
///
/// Used in: `poll()` before handing an entry to the view
macro_rules! debug_assert_lane_order {
    ($lane:literal, $last:expr, $next:expr) => {
        debug_assert!(
            $next > $last,
            "INV-QUEUE-02 violated: {} lane sequence went from {} to {}",
            $lane,
            $last,
            $next
        )
    };
}

// =============================================================================
// INV-QUEUE-03: Backlog Consistency
// =============================================================================

/// Assert that the backlog counter equals the number of queued data entries.
///
/// **Invariant**: `backlog == |{e in entries : e is Data}|`
///
/// Used in: `append()` and `poll()` after mutating the queue
macro_rules! debug_assert_backlog_consistent {
    ($backlog:expr, $data_count:expr) => {
        debug_assert!(
            $backlog == $data_count,
            "INV-QUEUE-03 violated: backlog {} but {} data entries queued",
            $backlog,
            $data_count
        )
    };
}

// =============================================================================
// INV-CREDIT-01: Credit Never Underflows
// =============================================================================

/// Assert that a data entry is only delivered while credit is available.
///
/// **Invariant**: `granted_total - delivered_data == credit >= 0`
///
/// Used in: `poll()` before decrementing credit for a data entry
macro_rules! debug_assert_credit_available {
    ($credit:expr) => {
        debug_assert!(
            $credit > 0,
            "INV-CREDIT-01 violated: delivering data at zero credit"
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_backlog_consistent;
pub(crate) use debug_assert_credit_available;
pub(crate) use debug_assert_lane_order;
pub(crate) use debug_assert_pool_accounting;
pub(crate) use debug_assert_priority_prefix;
