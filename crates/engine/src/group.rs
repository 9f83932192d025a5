//! Groups: discrete key partitions with incrementally folded aggregates.
//!
//! A group partitions its parent dimension's values into discrete keys
//! and keeps one accumulator per key, ascending by key. Group membership
//! is filter-independent; only the accumulators reflect the current
//! selection. The group listens to its dimension for new records (to
//! bind them to keys) and to every dimension's filter changes (to fold
//! affected records in or out).

use crate::dimension::{DimensionState, KeyListener};
use crate::reduce::{Count, ReduceOp, Sum};
use crate::store::{FilterListener, Listeners, RecordId, Store};
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::cmp::Ordering;
use core::mem;
use sift_core::{top_k, DimensionId};

/// A group key and its incrementally maintained aggregate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupEntry<G, A> {
    /// The group key.
    pub key: G,
    /// The current aggregate over selected records with this key.
    pub value: A,
}

pub(crate) struct GroupState<T, K, G, A> {
    key_fn: Rc<dyn Fn(&K) -> G>,
    op: Box<dyn ReduceOp<T, Acc = A>>,
    /// Ascending by key.
    groups: Vec<GroupEntry<G, A>>,
    /// Record id -> group position; kept only while more than one group
    /// exists, so the common single-group case pays for no table.
    group_index: Option<Vec<usize>>,
    /// Set when the operator changed; accumulators are refolded from
    /// scratch on the next read.
    reset_needed: bool,
    /// Comparator over aggregates for `top`.
    order: Option<Box<dyn Fn(&A, &A) -> Ordering>>,
}

impl<T, K, G, A> GroupState<T, K, G, A>
where
    G: Ord + Clone,
{
    /// Refolds every accumulator from the currently selected records.
    fn reset(&mut self, store: &Store<T>) {
        for entry in &mut self.groups {
            entry.value = self.op.initial();
        }
        match &self.group_index {
            Some(table) => {
                for id in 0..store.len() {
                    if store.filters.is_clear(id) {
                        let entry = &mut self.groups[table[id]];
                        self.op.add(&mut entry.value, &store.records[id]);
                    }
                }
            }
            None => {
                if let Some(entry) = self.groups.first_mut() {
                    for id in 0..store.len() {
                        if store.filters.is_clear(id) {
                            self.op.add(&mut entry.value, &store.records[id]);
                        }
                    }
                }
            }
        }
        self.reset_needed = false;
    }
}

impl<T, K, G, A> KeyListener<T, K> for GroupState<T, K, G, A>
where
    G: Ord + Clone,
{
    /// Merges the batch's sorted (key, record) run into the group array
    /// in one linear pass, creating group nodes where a key falls
    /// between existing keys, binding every new record to its group, and
    /// folding in the records that are globally selected.
    fn on_keys(&mut self, store: &Store<T>, values: &[K], index: &[usize], n0: usize, n1: usize) {
        let old_groups = mem::take(&mut self.groups);
        let k0 = old_groups.len();
        let mut re_index = vec![0usize; k0];

        // The record -> group table spans the whole store during the
        // merge; it is dropped again below if the cardinality stays at
        // one.
        let mut table = match self.group_index.take() {
            Some(mut table) if k0 > 1 => {
                table.resize(store.len(), 0);
                table
            }
            _ => vec![0usize; store.len()],
        };

        let mut groups: Vec<GroupEntry<G, A>> = Vec::with_capacity(k0 + 1);
        let mut old_iter = old_groups.into_iter();
        let mut cur_old = old_iter.next();
        let mut old_pos = 0;
        let mut i1 = 0;

        while i1 < n1 {
            let x1 = (self.key_fn)(&values[i1]);

            // Take the lesser of the next old group and the new key; the
            // old group wins ties so its accumulator is kept.
            let mut entry = match cur_old.take() {
                Some(old) if old.key <= x1 => {
                    re_index[old_pos] = groups.len();
                    old_pos += 1;
                    cur_old = old_iter.next();
                    old
                }
                other => {
                    cur_old = other;
                    GroupEntry {
                        key: x1,
                        value: self.op.initial(),
                    }
                }
            };

            // Bind every new record with this key, folding in the ones
            // that are globally selected.
            let slot = groups.len();
            while i1 < n1 {
                let key = (self.key_fn)(&values[i1]);
                if key > entry.key {
                    break;
                }
                let id = n0 + index[i1];
                table[id] = slot;
                if !self.reset_needed && store.filters.is_clear(id) {
                    self.op.add(&mut entry.value, &store.records[id]);
                }
                i1 += 1;
            }
            groups.push(entry);
        }

        // Old groups greater than every new key gained no records.
        while let Some(entry) = cur_old.take() {
            re_index[old_pos] = groups.len();
            old_pos += 1;
            groups.push(entry);
            cur_old = old_iter.next();
        }

        // New groups may have shifted old ones; re-point the old
        // records' table slots.
        if groups.len() > k0 && k0 > 0 {
            for id in 0..n0 {
                table[id] = re_index[table[id]];
            }
        }

        self.group_index = if groups.len() > 1 { Some(table) } else { None };
        self.groups = groups;
    }
}

impl<T, K, G, A> FilterListener<T> for GroupState<T, K, G, A>
where
    G: Ord + Clone,
{
    fn on_filter(
        &mut self,
        store: &Store<T>,
        dim: DimensionId,
        added: &[RecordId],
        removed: &[RecordId],
    ) {
        if self.reset_needed || self.groups.is_empty() {
            return;
        }
        match &self.group_index {
            Some(table) => {
                for &id in added {
                    if store.filters.is_clear(id) {
                        let entry = &mut self.groups[table[id]];
                        self.op.add(&mut entry.value, &store.records[id]);
                    }
                }
                for &id in removed {
                    if store.filters.is_only(id, dim) {
                        let entry = &mut self.groups[table[id]];
                        self.op.remove(&mut entry.value, &store.records[id]);
                    }
                }
            }
            None => {
                // Single-group fast path: no table lookups.
                let entry = &mut self.groups[0];
                for &id in added {
                    if store.filters.is_clear(id) {
                        self.op.add(&mut entry.value, &store.records[id]);
                    }
                }
                for &id in removed {
                    if store.filters.is_only(id, dim) {
                        self.op.remove(&mut entry.value, &store.records[id]);
                    }
                }
            }
        }
    }
}

/// A partition of one dimension's values into discrete keys, each with
/// an incrementally maintained aggregate.
///
/// Created by [`Dimension::group`](crate::Dimension::group) with the
/// count operator and natural ordering installed. Installing a different
/// operator with [`reduce`](Group::reduce) consumes the handle and
/// returns one typed by the new accumulator.
pub struct Group<T, K, G, A> {
    store: Rc<RefCell<Store<T>>>,
    listeners: Rc<RefCell<Listeners<T>>>,
    dimension: Rc<RefCell<DimensionState<T, K>>>,
    state: Rc<RefCell<GroupState<T, K, G, A>>>,
    /// Slots of this group's listener registrations, replaced in place
    /// when `reduce` retypes the accumulator.
    key_slot: usize,
    filter_slot: usize,
}

impl<T, K, G> Group<T, K, G, u64>
where
    T: 'static,
    K: Ord + Clone + 'static,
    G: Ord + Clone + 'static,
{
    pub(crate) fn register(
        store: Rc<RefCell<Store<T>>>,
        listeners: Rc<RefCell<Listeners<T>>>,
        dimension: Rc<RefCell<DimensionState<T, K>>>,
        key_fn: Rc<dyn Fn(&K) -> G>,
    ) -> Self {
        let state = Rc::new(RefCell::new(GroupState {
            key_fn,
            op: Box::new(Count) as Box<dyn ReduceOp<T, Acc = u64>>,
            groups: Vec::new(),
            group_index: None,
            reset_needed: false,
            order: Some(Box::new(|a: &u64, b: &u64| a.cmp(b))),
        }));

        let key_slot;
        let filter_slot;
        {
            let mut dim_state = dimension.borrow_mut();
            dim_state.key_listeners.push(state.clone());
            key_slot = dim_state.key_listeners.len() - 1;
        }
        {
            let mut listeners = listeners.borrow_mut();
            listeners.filter.push(state.clone());
            filter_slot = listeners.filter.len() - 1;
        }

        // Ingest the existing records through the same merge inserts
        // use; the dimension's full index doubles as the sorted run.
        {
            let store_ref = store.borrow();
            let dim_state = dimension.borrow();
            state.borrow_mut().on_keys(
                &store_ref,
                &dim_state.values,
                &dim_state.index,
                0,
                store_ref.len(),
            );
        }

        Self {
            store,
            listeners,
            dimension,
            state,
            key_slot,
            filter_slot,
        }
    }
}

impl<T, K, G, A> Group<T, K, G, A>
where
    T: 'static,
    K: Ord + Clone + 'static,
    G: Ord + Clone + 'static,
    A: 'static,
{
    /// Installs a new reduce operator, keeping the group keys and
    /// memberships but discarding the aggregates; they are refolded from
    /// scratch on the next read, so repeated `reduce` calls before a
    /// read cost nothing extra. Any `order` installed for the previous
    /// accumulator type is cleared.
    pub fn reduce<R>(self, op: R) -> Group<T, K, G, R::Acc>
    where
        R: ReduceOp<T> + 'static,
        R::Acc: 'static,
    {
        let op: Box<dyn ReduceOp<T, Acc = R::Acc>> = Box::new(op);
        let new_state = {
            let old = self.state.borrow();
            Rc::new(RefCell::new(GroupState {
                key_fn: old.key_fn.clone(),
                groups: old
                    .groups
                    .iter()
                    .map(|entry| GroupEntry {
                        key: entry.key.clone(),
                        value: op.initial(),
                    })
                    .collect(),
                group_index: old.group_index.clone(),
                op,
                reset_needed: true,
                order: None,
            }))
        };

        // Re-point this group's listener slots at the retyped state; the
        // old state is dropped with the consumed handle.
        self.dimension.borrow_mut().key_listeners[self.key_slot] = new_state.clone();
        self.listeners.borrow_mut().filter[self.filter_slot] = new_state.clone();

        Group {
            store: self.store,
            listeners: self.listeners,
            dimension: self.dimension,
            state: new_state,
            key_slot: self.key_slot,
            filter_slot: self.filter_slot,
        }
    }

    /// Installs the count operator, with natural ordering.
    pub fn reduce_count(self) -> Group<T, K, G, u64> {
        self.reduce(Count).order_natural()
    }

    /// Installs a sum over the given accessor, ordered by total value.
    pub fn reduce_sum<F>(self, accessor: F) -> Group<T, K, G, f64>
    where
        F: Fn(&T) -> f64 + 'static,
    {
        self.reduce(Sum::new(accessor)).order_by(f64::total_cmp)
    }

    /// Sets the ordering `top` uses, comparing aggregates directly.
    pub fn order_by<F>(self, cmp: F) -> Self
    where
        F: Fn(&A, &A) -> Ordering + 'static,
    {
        self.state.borrow_mut().order = Some(Box::new(cmp));
        self
    }

    /// Sets the ordering `top` uses through an accessor into the
    /// aggregate.
    pub fn order<V, F>(self, accessor: F) -> Self
    where
        V: Ord,
        F: Fn(&A) -> V + 'static,
    {
        self.order_by(move |a, b| accessor(a).cmp(&accessor(b)))
    }

    /// Orders `top` by the aggregate's own ordering.
    pub fn order_natural(self) -> Self
    where
        A: Ord,
    {
        self.order_by(|a: &A, b: &A| a.cmp(b))
    }

    /// Returns every group ascending by key, refolding first if an
    /// operator change is pending.
    pub fn all(&self) -> Vec<GroupEntry<G, A>>
    where
        A: Clone,
    {
        let mut state = self.state.borrow_mut();
        if state.reset_needed {
            let store = self.store.borrow();
            state.reset(&store);
        }
        state.groups.clone()
    }

    /// Returns the `k` groups with the greatest aggregates under the
    /// installed ordering, greatest first.
    ///
    /// # Panics
    ///
    /// Panics if no ordering is installed; `reduce` clears the ordering,
    /// so follow it with `order`, `order_by`, or `order_natural` before
    /// calling `top`.
    pub fn top(&self, k: usize) -> Vec<GroupEntry<G, A>>
    where
        A: Clone,
    {
        let groups = self.all();
        let state = self.state.borrow();
        let cmp = state
            .order
            .as_ref()
            .expect("group has no ordering; call order()/order_by()/order_natural() after reduce()");
        top_k(&groups, k, |a, b| cmp(&a.value, &b.value))
    }

    /// Returns the number of distinct group keys, irrespective of any
    /// filters.
    pub fn size(&self) -> usize {
        self.state.borrow().groups.len()
    }
}
