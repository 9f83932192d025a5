//! The single-aggregate group over the global selection.
//!
//! `GroupAll` is the cardinality-one specialization of grouping: one
//! running accumulator, no key array and no record table. It shares the
//! reduce-operator contract and the lazy reset behavior with `Group`.

use crate::reduce::{Count, ReduceOp, Sum};
use crate::store::{FilterListener, InsertListener, Listeners, RecordId, Store};
use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use sift_core::DimensionId;

pub(crate) struct GroupAllState<T, A> {
    op: Box<dyn ReduceOp<T, Acc = A>>,
    value: A,
    reset_needed: bool,
}

impl<T, A> GroupAllState<T, A> {
    /// Refolds the accumulator from the currently selected records.
    fn reset(&mut self, store: &Store<T>) {
        self.value = self.op.initial();
        for id in 0..store.len() {
            if store.filters.is_clear(id) {
                self.op.add(&mut self.value, &store.records[id]);
            }
        }
        self.reset_needed = false;
    }
}

impl<T, A> InsertListener<T> for GroupAllState<T, A> {
    fn pre_insert(&mut self, _store: &mut Store<T>, _n0: usize, _n1: usize) {}

    fn post_insert(&mut self, store: &Store<T>, n0: usize, n1: usize) {
        if self.reset_needed {
            return;
        }
        for id in n0..n0 + n1 {
            if store.filters.is_clear(id) {
                self.op.add(&mut self.value, &store.records[id]);
            }
        }
    }
}

impl<T, A> FilterListener<T> for GroupAllState<T, A> {
    fn on_filter(
        &mut self,
        store: &Store<T>,
        dim: DimensionId,
        added: &[RecordId],
        removed: &[RecordId],
    ) {
        if self.reset_needed {
            return;
        }
        for &id in added {
            if store.filters.is_clear(id) {
                self.op.add(&mut self.value, &store.records[id]);
            }
        }
        for &id in removed {
            if store.filters.is_only(id, dim) {
                self.op.remove(&mut self.value, &store.records[id]);
            }
        }
    }
}

/// A single incrementally maintained aggregate over the global
/// selection.
///
/// Created by [`Sift::group_all`](crate::Sift::group_all) or
/// [`Dimension::group_all`](crate::Dimension::group_all) with the count
/// operator installed; both forms observe the same global selection.
pub struct GroupAll<T, A> {
    store: Rc<RefCell<Store<T>>>,
    listeners: Rc<RefCell<Listeners<T>>>,
    state: Rc<RefCell<GroupAllState<T, A>>>,
    /// Slots of this group's listener registrations, replaced in place
    /// when `reduce` retypes the accumulator.
    insert_slot: usize,
    filter_slot: usize,
}

impl<T: 'static> GroupAll<T, u64> {
    pub(crate) fn register(
        store: Rc<RefCell<Store<T>>>,
        listeners: Rc<RefCell<Listeners<T>>>,
    ) -> Self {
        let state = Rc::new(RefCell::new(GroupAllState {
            op: Box::new(Count) as Box<dyn ReduceOp<T, Acc = u64>>,
            value: 0,
            // The first read folds the existing records.
            reset_needed: true,
        }));

        let insert_slot;
        let filter_slot;
        {
            let mut listeners = listeners.borrow_mut();
            listeners.insert.push(state.clone());
            insert_slot = listeners.insert.len() - 1;
            listeners.filter.push(state.clone());
            filter_slot = listeners.filter.len() - 1;
        }

        Self {
            store,
            listeners,
            state,
            insert_slot,
            filter_slot,
        }
    }
}

impl<T, A> GroupAll<T, A>
where
    T: 'static,
    A: 'static,
{
    /// Installs a new reduce operator; the accumulator is refolded from
    /// scratch on the next `value`, so repeated `reduce` calls before a
    /// read cost nothing extra.
    pub fn reduce<R>(self, op: R) -> GroupAll<T, R::Acc>
    where
        R: ReduceOp<T> + 'static,
        R::Acc: 'static,
    {
        let op: Box<dyn ReduceOp<T, Acc = R::Acc>> = Box::new(op);
        let value = op.initial();
        let new_state = Rc::new(RefCell::new(GroupAllState {
            op,
            value,
            reset_needed: true,
        }));

        {
            let mut listeners = self.listeners.borrow_mut();
            listeners.insert[self.insert_slot] = new_state.clone();
            listeners.filter[self.filter_slot] = new_state.clone();
        }

        GroupAll {
            store: self.store,
            listeners: self.listeners,
            state: new_state,
            insert_slot: self.insert_slot,
            filter_slot: self.filter_slot,
        }
    }

    /// Installs the count operator.
    pub fn reduce_count(self) -> GroupAll<T, u64> {
        self.reduce(Count)
    }

    /// Installs a sum over the given accessor.
    pub fn reduce_sum<F>(self, accessor: F) -> GroupAll<T, f64>
    where
        F: Fn(&T) -> f64 + 'static,
    {
        self.reduce(Sum::new(accessor))
    }

    /// Returns the aggregate over the currently selected records,
    /// refolding first if an operator change is pending.
    pub fn value(&self) -> A
    where
        A: Clone,
    {
        let mut state = self.state.borrow_mut();
        if state.reset_needed {
            let store = self.store.borrow();
            state.reset(&store);
        }
        state.value.clone()
    }
}
