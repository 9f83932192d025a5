//! Dimensions: derived sort keys with an incrementally merged index.
//!
//! A dimension keeps its records' keys in ascending order next to a
//! permutation mapping sorted rank to record id, and its current filter
//! both as a `FilterSpec` (re-evaluated against inserts) and as the
//! resolved rank intervals. Filter changes are diffed against the stored
//! intervals so only the affected records have their bit flipped and are
//! re-folded by groups.

use crate::filter::{FilterSpec, FilterTerm};
use crate::group::Group;
use crate::group_all::GroupAll;
use crate::store::{InsertListener, Listeners, RecordId, Store};
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::mem;
use sift_core::{diff, DimensionId, RankInterval};

/// A listener on a dimension's key assignment for newly inserted
/// records. Runs in Phase B, when the filter mask for the batch is
/// complete; `values`/`index` are the batch's sorted keys and local
/// permutation, so record `i` of the run has id `n0 + index[i]`.
pub(crate) trait KeyListener<T, K> {
    fn on_keys(&mut self, store: &Store<T>, values: &[K], index: &[usize], n0: usize, n1: usize);
}

pub(crate) struct DimensionState<T, K> {
    pub(crate) dim: DimensionId,
    accessor: Box<dyn Fn(&T) -> K>,
    /// Keys in ascending order; equal keys keep insertion order.
    pub(crate) values: Vec<K>,
    /// Sorted rank -> record id.
    pub(crate) index: Vec<RecordId>,
    /// The current selection. Invariant: the union of these intervals is
    /// exactly the set of ranks whose record has this dimension's bit
    /// clear.
    pub(crate) bounds: Vec<RankInterval>,
    /// The active filter, re-evaluated against future inserts.
    refilter: FilterSpec<K>,
    /// Groups bound to this dimension.
    pub(crate) key_listeners: Vec<Rc<RefCell<dyn KeyListener<T, K>>>>,
    /// The in-flight batch's sorted run, alive between Phase A and
    /// Phase B.
    new_values: Vec<K>,
    new_index: Vec<usize>,
}

impl<T, K: Ord + Clone> InsertListener<T> for DimensionState<T, K> {
    fn pre_insert(&mut self, store: &mut Store<T>, n0: usize, n1: usize) {
        // Sort the batch by key. The sort is stable over ascending local
        // ids, so equal keys keep insertion order.
        let keys: Vec<K> = store.records[n0..n0 + n1]
            .iter()
            .map(|r| (self.accessor)(r))
            .collect();
        let mut order: Vec<usize> = (0..n1).collect();
        order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
        let new_values: Vec<K> = order.iter().map(|&i| keys[i].clone()).collect();

        // Classify the batch against the active filter: every new record
        // starts excluded, then the ranks the filter selects are cleared.
        let batch_bounds = self.refilter.apply(&new_values);
        for &local in &order {
            store.filters.set(self.dim, n0 + local);
        }
        for b in &batch_bounds {
            for rank in b.ranks() {
                store.filters.clear(self.dim, n0 + order[rank]);
            }
        }

        if n0 == 0 {
            self.values = new_values.clone();
            self.index = order.clone();
        } else {
            // Linear merge of the two sorted runs. The existing side wins
            // ties, keeping equal keys in insertion order.
            let mut values = Vec::with_capacity(n0 + n1);
            let mut index = Vec::with_capacity(n0 + n1);
            let (mut i0, mut i1) = (0, 0);
            while i0 < self.values.len() && i1 < n1 {
                if self.values[i0] <= new_values[i1] {
                    values.push(self.values[i0].clone());
                    index.push(self.index[i0]);
                    i0 += 1;
                } else {
                    values.push(new_values[i1].clone());
                    index.push(n0 + order[i1]);
                    i1 += 1;
                }
            }
            while i0 < self.values.len() {
                values.push(self.values[i0].clone());
                index.push(self.index[i0]);
                i0 += 1;
            }
            while i1 < n1 {
                values.push(new_values[i1].clone());
                index.push(n0 + order[i1]);
                i1 += 1;
            }
            self.values = values;
            self.index = index;
        }

        // Re-resolve the selection over the merged key array.
        self.bounds = self.refilter.apply(&self.values);

        self.new_values = new_values;
        self.new_index = order;
    }

    fn post_insert(&mut self, store: &Store<T>, n0: usize, n1: usize) {
        let values = mem::take(&mut self.new_values);
        let index = mem::take(&mut self.new_index);
        for listener in &self.key_listeners {
            listener
                .borrow_mut()
                .on_keys(store, &values, &index, n0, n1);
        }
    }
}

/// A derived ordering over the record set, independently filterable.
///
/// Dimensions hold non-owning handles into their engine's store and must
/// not outlive it; dropping the handle does not retire the dimension's
/// filter.
pub struct Dimension<T, K> {
    store: Rc<RefCell<Store<T>>>,
    listeners: Rc<RefCell<Listeners<T>>>,
    state: Rc<RefCell<DimensionState<T, K>>>,
}

impl<T, K> Clone for Dimension<T, K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            listeners: self.listeners.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T, K> Dimension<T, K>
where
    T: 'static,
    K: Ord + Clone + 'static,
{
    pub(crate) fn new(
        store: Rc<RefCell<Store<T>>>,
        listeners: Rc<RefCell<Listeners<T>>>,
        accessor: impl Fn(&T) -> K + 'static,
    ) -> Self {
        let dim = store.borrow_mut().filters.add_lane();
        let state = Rc::new(RefCell::new(DimensionState {
            dim,
            accessor: Box::new(accessor),
            values: Vec::new(),
            index: Vec::new(),
            bounds: Vec::new(),
            refilter: FilterSpec::All,
            key_listeners: Vec::new(),
            new_values: Vec::new(),
            new_index: Vec::new(),
        }));
        listeners.borrow_mut().insert.push(state.clone());

        // Ingest the existing records through the normal two-phase path;
        // no other dimension is affected, so both phases run back to
        // back.
        let n = store.borrow().len();
        {
            let mut store_ref = store.borrow_mut();
            state.borrow_mut().pre_insert(&mut store_ref, 0, n);
        }
        {
            let store_ref = store.borrow();
            state.borrow_mut().post_insert(&store_ref, 0, n);
        }

        Self {
            store,
            listeners,
            state,
        }
    }

    /// Applies a filter spec, replacing any previous filter on this
    /// dimension.
    pub fn filter(&self, spec: FilterSpec<K>) {
        self.filter_index(spec);
    }

    /// Filters to records whose key equals `value`.
    pub fn filter_exact(&self, value: K) {
        self.filter_index(FilterSpec::Exact(value));
    }

    /// Filters to records whose key lies in the half-open range
    /// `[lo, hi)`.
    pub fn filter_range(&self, lo: K, hi: K) {
        self.filter_index(FilterSpec::Range(lo, hi));
    }

    /// Filters to the union of the given terms.
    pub fn filter_union(&self, terms: impl IntoIterator<Item = FilterTerm<K>>) {
        self.filter_index(FilterSpec::Union(terms.into_iter().collect()));
    }

    /// Clears this dimension's filter.
    pub fn filter_all(&self) {
        self.filter_index(FilterSpec::All);
    }

    /// Resolves the new spec to rank intervals, diffs them against the
    /// current selection, flips this dimension's bit for the delta, and
    /// broadcasts the added/removed record ids to every group.
    fn filter_index(&self, spec: FilterSpec<K>) {
        let dim;
        let mut added = Vec::new();
        let mut removed = Vec::new();
        {
            let mut state = self.state.borrow_mut();
            let mut store = self.store.borrow_mut();
            let new_bounds = spec.apply(&state.values);
            let (add_ivs, remove_ivs) = diff(&state.bounds, &new_bounds);
            dim = state.dim;
            for iv in &add_ivs {
                for rank in iv.ranks() {
                    let id = state.index[rank];
                    store.filters.clear(dim, id);
                    added.push(id);
                }
            }
            for iv in &remove_ivs {
                for rank in iv.ranks() {
                    let id = state.index[rank];
                    store.filters.set(dim, id);
                    removed.push(id);
                }
            }
            state.bounds = new_bounds;
            state.refilter = spec;
        }

        let filter_listeners = self.listeners.borrow().filter.clone();
        let store = self.store.borrow();
        for listener in &filter_listeners {
            listener
                .borrow_mut()
                .on_filter(&store, dim, &added, &removed);
        }
    }

    /// Returns up to `k` globally selected records in descending key
    /// order. Pass `usize::MAX` for every selected record. Saturates
    /// when fewer than `k` records are selected.
    pub fn top(&self, k: usize) -> Vec<T>
    where
        T: Clone,
    {
        if k == 0 {
            return Vec::new();
        }
        let state = self.state.borrow();
        let store = self.store.borrow();
        let mut out = Vec::new();
        'walk: for iv in state.bounds.iter().rev() {
            for rank in iv.ranks().rev() {
                let id = state.index[rank];
                if store.filters.is_clear(id) {
                    out.push(store.records[id].clone());
                    if out.len() == k {
                        break 'walk;
                    }
                }
            }
        }
        out
    }

    /// Creates a group keyed by `key` over this dimension's values,
    /// counting records until another operator is installed. Iteration
    /// order of the group array is always ascending by group key.
    pub fn group<G, F>(&self, key: F) -> Group<T, K, G, u64>
    where
        G: Ord + Clone + 'static,
        F: Fn(&K) -> G + 'static,
    {
        Group::register(
            self.store.clone(),
            self.listeners.clone(),
            self.state.clone(),
            Rc::new(key),
        )
    }

    /// Creates a group keyed by this dimension's own values, one group
    /// per distinct key.
    pub fn group_values(&self) -> Group<T, K, K, u64> {
        self.group(|key| key.clone())
    }

    /// Creates a single-aggregate group over the global selection.
    pub fn group_all(&self) -> GroupAll<T, u64> {
        GroupAll::register(self.store.clone(), self.listeners.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::store::Sift;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn test_top_descending_order() {
        let data = Sift::with_records(vec![5i64, 1, 9, 3]);
        let d = data.dimension(|v: &i64| *v);
        assert_eq!(d.top(2), vec![9, 5]);
        assert_eq!(d.top(usize::MAX), vec![9, 5, 3, 1]);
        assert_eq!(d.top(0), Vec::<i64>::new());
    }

    #[test]
    fn test_filter_exact_and_clear() {
        let data = Sift::with_records(vec![5i64, 1, 9, 3, 9]);
        let d = data.dimension(|v: &i64| *v);
        d.filter_exact(9);
        assert_eq!(d.top(usize::MAX), vec![9, 9]);
        d.filter_all();
        assert_eq!(d.top(usize::MAX), vec![9, 9, 5, 3, 1]);
    }

    #[test]
    fn test_filter_range_half_open() {
        let data = Sift::with_records(vec![10i64, 20, 30, 40]);
        let d = data.dimension(|v: &i64| *v);
        d.filter_range(20, 40);
        assert_eq!(d.top(usize::MAX), vec![30, 20]);
    }

    #[test]
    fn test_filters_intersect_across_dimensions() {
        let data = Sift::with_records(vec![(1i64, 10i64), (2, 20), (3, 10), (4, 20)]);
        let a = data.dimension(|v: &(i64, i64)| v.0);
        let b = data.dimension(|v: &(i64, i64)| v.1);
        b.filter_exact(20);
        assert_eq!(a.top(usize::MAX), vec![(4, 20), (2, 20)]);
        a.filter_range(1, 3);
        assert_eq!(a.top(usize::MAX), vec![(2, 20)]);
        // The other dimension's view observes both filters too.
        assert_eq!(b.top(usize::MAX), vec![(2, 20)]);
    }

    #[test]
    fn test_insert_respects_active_filter() {
        let data = Sift::with_records(vec![1i64, 5]);
        let d = data.dimension(|v: &i64| *v);
        d.filter_range(0, 4);
        data.add(vec![2i64, 7]);
        // The new record 2 enters the selection, 7 stays out.
        assert_eq!(d.top(usize::MAX), vec![2, 1]);
        d.filter_all();
        assert_eq!(d.top(usize::MAX), vec![7, 5, 2, 1]);
    }

    #[test]
    fn test_equal_keys_keep_insertion_order() {
        let data = Sift::with_records(vec![(0usize, 7i64), (1, 7)]);
        let d = data.dimension(|v: &(usize, i64)| v.1);
        data.add(vec![(2usize, 7i64)]);
        // Descending walk sees the latest-inserted equal key first.
        let ids: Vec<usize> = d.top(usize::MAX).into_iter().map(|v| v.0).collect();
        assert_eq!(ids, vec![2, 1, 0]);
    }

    #[test]
    fn test_dimension_created_after_filtering() {
        let data = Sift::with_records(vec![(1i64, 10i64), (2, 20)]);
        let a = data.dimension(|v: &(i64, i64)| v.0);
        a.filter_exact(2);
        // A dimension created now still sees the other filter globally.
        let b = data.dimension(|v: &(i64, i64)| v.1);
        assert_eq!(b.top(usize::MAX), vec![(2, 20)]);
    }
}
