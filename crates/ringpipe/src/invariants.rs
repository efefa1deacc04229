//! Debug assertion macros for ring buffer invariants.
//!
//! Active only in debug builds, so there is zero overhead in release builds.
//! Used by both ring variants through `SeqState`.

/// Assert that the item count never exceeds capacity.
///
/// **Invariant**: `0 <= (write_seq - read_seq) <= capacity`
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "bounded-count violated: {} items in a ring of capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that a sequence number only increases.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "monotonic-progress violated: {} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

/// Assert that the reader never advances past the writer.
macro_rules! debug_assert_reader_behind_writer {
    ($new_read:expr, $write:expr) => {
        debug_assert!(
            $new_read <= $write,
            "bounded-count violated: read_seq {} advanced beyond write_seq {}",
            $new_read,
            $write
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_reader_behind_writer;
