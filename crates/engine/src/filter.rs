//! Filter specifications over a dimension's sorted keys.
//!
//! A dimension stores its active filter as a `FilterSpec` rather than as
//! resolved intervals, because the spec must be re-evaluated both against
//! newly inserted batches and against the merged key array afterwards.

use alloc::vec;
use alloc::vec::Vec;
use sift_core::{bisect, coalesce, RankInterval};

/// One term of a union filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterTerm<K> {
    /// Selects keys equal to the value.
    Exact(K),
    /// Selects keys in the half-open range `[lo, hi)`.
    Range(K, K),
}

/// A dimension's active filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterSpec<K> {
    /// Selects every record; the state of an unfiltered dimension.
    All,
    /// Selects keys equal to the value.
    Exact(K),
    /// Selects keys in the half-open range `[lo, hi)`.
    Range(K, K),
    /// Selects the union of the terms.
    Union(Vec<FilterTerm<K>>),
}

impl<K: Ord> FilterSpec<K> {
    /// Resolves the spec to selection intervals over the sorted key array
    /// by bisection, O(log n) per term. The result is sorted and
    /// disjoint: union terms that overlap are merged, so the interval
    /// diff's precondition holds by construction.
    pub fn apply(&self, values: &[K]) -> Vec<RankInterval> {
        match self {
            FilterSpec::All => coalesce(vec![RankInterval::new(0, values.len())]),
            FilterSpec::Exact(v) => coalesce(vec![exact(values, v)]),
            FilterSpec::Range(lo, hi) => coalesce(vec![range(values, lo, hi)]),
            FilterSpec::Union(terms) => coalesce(
                terms
                    .iter()
                    .map(|term| match term {
                        FilterTerm::Exact(v) => exact(values, v),
                        FilterTerm::Range(lo, hi) => range(values, lo, hi),
                    })
                    .collect(),
            ),
        }
    }
}

fn exact<K: Ord>(values: &[K], v: &K) -> RankInterval {
    RankInterval::new(
        bisect::lower_bound(values, v),
        bisect::upper_bound(values, v),
    )
}

fn range<K: Ord>(values: &[K], lo: &K, hi: &K) -> RankInterval {
    RankInterval::new(
        bisect::lower_bound(values, lo),
        bisect::lower_bound(values, hi),
    )
}
