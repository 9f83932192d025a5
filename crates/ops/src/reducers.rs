//! Concrete reduce operators: count, sum, average, extents.

use crate::finalize::Finalize;
use alloc::vec::Vec;
use sift_core::bisect::lower_bound;
use sift_engine::{Count, ReduceOp, Sum};

/// Counts selected records.
pub fn count() -> Count {
    Count
}

/// Sums `accessor` over selected records.
pub fn sum<F>(accessor: F) -> Sum<F> {
    Sum::new(accessor)
}

/// Averages `accessor` over selected records. The accumulator carries
/// the count and sum; the average itself is a finalize-time value.
pub fn average<F>(accessor: F) -> Average<F> {
    Average { accessor }
}

/// Tracks the minimum and maximum of `accessor` over selected records.
pub fn extents<F>(accessor: F) -> Extents<F> {
    Extents { accessor }
}

/// The running state of an average: selected-record count and sum.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AverageAcc {
    /// Number of selected records folded in.
    pub count: u64,
    /// Sum of the accessor over those records.
    pub sum: f64,
}

impl AverageAcc {
    /// The current average, or 0.0 when nothing is selected.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

impl Finalize for AverageAcc {
    type Output = f64;

    fn finalize(self) -> f64 {
        self.average()
    }
}

/// See [`average`].
pub struct Average<F> {
    accessor: F,
}

impl<T, F> ReduceOp<T> for Average<F>
where
    F: Fn(&T) -> f64,
{
    type Acc = AverageAcc;

    fn initial(&self) -> AverageAcc {
        AverageAcc::default()
    }

    fn add(&self, acc: &mut AverageAcc, record: &T) {
        acc.count += 1;
        acc.sum += (self.accessor)(record);
    }

    fn remove(&self, acc: &mut AverageAcc, record: &T) {
        acc.count -= 1;
        acc.sum -= (self.accessor)(record);
    }
}

/// The running state of an extents reduction: the selected values as a
/// sorted multiset, so removal of the current extreme reveals the next
/// one without a rescan of the records.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtentsAcc<V> {
    candidates: Vec<V>,
}

impl<V: Clone> ExtentsAcc<V> {
    /// The current `(min, max)`, or `None` when nothing is selected.
    pub fn extents(&self) -> Option<(V, V)> {
        match (self.candidates.first(), self.candidates.last()) {
            (Some(min), Some(max)) => Some((min.clone(), max.clone())),
            _ => None,
        }
    }
}

impl<V: Clone> Finalize for ExtentsAcc<V> {
    type Output = Option<(V, V)>;

    fn finalize(self) -> Option<(V, V)> {
        self.extents()
    }
}

/// See [`extents`].
pub struct Extents<F> {
    accessor: F,
}

impl<T, V, F> ReduceOp<T> for Extents<F>
where
    V: Ord + Clone,
    F: Fn(&T) -> V,
{
    type Acc = ExtentsAcc<V>;

    fn initial(&self) -> ExtentsAcc<V> {
        ExtentsAcc {
            candidates: Vec::new(),
        }
    }

    fn add(&self, acc: &mut ExtentsAcc<V>, record: &T) {
        let value = (self.accessor)(record);
        let at = lower_bound(&acc.candidates, &value);
        acc.candidates.insert(at, value);
    }

    fn remove(&self, acc: &mut ExtentsAcc<V>, record: &T) {
        let value = (self.accessor)(record);
        let at = lower_bound(&acc.candidates, &value);
        if acc.candidates.get(at) == Some(&value) {
            acc.candidates.remove(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_folds_and_inverts() {
        let op = average(|v: &i64| *v as f64);
        let mut acc = op.initial();
        op.add(&mut acc, &10);
        op.add(&mut acc, &20);
        op.add(&mut acc, &60);
        assert_eq!(acc.average(), 30.0);
        op.remove(&mut acc, &60);
        assert_eq!(acc.average(), 15.0);
    }

    #[test]
    fn test_average_of_nothing_is_zero() {
        let op = average(|v: &i64| *v as f64);
        assert_eq!(op.initial().average(), 0.0);
    }

    #[test]
    fn test_extents_track_min_and_max() {
        let op = extents(|v: &i64| *v);
        let mut acc = op.initial();
        for v in [5i64, 1, 9, 1] {
            op.add(&mut acc, &v);
        }
        assert_eq!(acc.extents(), Some((1, 9)));

        // Removing one of two equal minimums keeps the other.
        op.remove(&mut acc, &1);
        assert_eq!(acc.extents(), Some((1, 9)));
        op.remove(&mut acc, &9);
        assert_eq!(acc.extents(), Some((1, 5)));
    }

    #[test]
    fn test_extents_empty() {
        let op = extents(|v: &i64| *v);
        let mut acc = op.initial();
        assert_eq!(acc.extents(), None);
        op.add(&mut acc, &3);
        op.remove(&mut acc, &3);
        assert_eq!(acc.extents(), None);
    }
}
