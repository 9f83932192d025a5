//! Bisection over sorted slices.
//!
//! The filter predicates locate rank boundaries in a dimension's sorted
//! key array with these two primitives. Both require the slice to be
//! sorted ascending; behavior on unsorted input is unspecified.

/// Returns the first index whose element is not less than `key`.
///
/// Equal elements all lie at or after the returned index, so
/// `lower_bound..upper_bound` spans exactly the run of elements equal to
/// `key`.
#[inline]
pub fn lower_bound<K: Ord>(values: &[K], key: &K) -> usize {
    values.partition_point(|v| v < key)
}

/// Returns the first index whose element is greater than `key`.
#[inline]
pub fn upper_bound<K: Ord>(values: &[K], key: &K) -> usize {
    values.partition_point(|v| v <= key)
}
