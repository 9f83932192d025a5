//! The record store and the engine entry point.
//!
//! `Sift` owns the records and their filter mask behind a shared handle,
//! and drives the two-phase insertion broadcast: every dimension
//! classifies a new batch (Phase A) before any group binds it to group
//! keys (Phase B), so a group never reads a partially classified filter
//! mask.

use crate::dimension::Dimension;
use crate::group_all::GroupAll;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use sift_core::{DimensionId, FilterMask};

/// Sequential identifier of a record; assigned at insertion, never
/// reused or reordered.
pub type RecordId = usize;

/// The records and their filter mask, exclusively owned by one engine
/// instance. Dimensions and groups hold non-owning handles into it.
pub struct Store<T> {
    pub(crate) records: Vec<T>,
    pub(crate) filters: FilterMask,
}

impl<T> Store<T> {
    pub(crate) fn new() -> Self {
        Self {
            records: Vec::new(),
            filters: FilterMask::new(),
        }
    }

    /// Returns the number of records, irrespective of any filters.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records have been added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the record with the given id.
    #[inline]
    pub fn record(&self, id: RecordId) -> &T {
        &self.records[id]
    }

    /// Returns the per-dimension filter mask.
    #[inline]
    pub fn mask(&self) -> &FilterMask {
        &self.filters
    }
}

/// A listener on record insertion. Dimensions run their key sort, index
/// merge, and filter classification in Phase A; Phase B runs only after
/// every listener's Phase A, when the filter mask for the new records is
/// complete.
pub(crate) trait InsertListener<T> {
    fn pre_insert(&mut self, store: &mut Store<T>, n0: usize, n1: usize);
    fn post_insert(&mut self, store: &Store<T>, n0: usize, n1: usize);
}

/// A listener on filter changes from any dimension. `added` and
/// `removed` carry the record ids whose bit for `dim` was just cleared
/// and set.
pub(crate) trait FilterListener<T> {
    fn on_filter(
        &mut self,
        store: &Store<T>,
        dim: DimensionId,
        added: &[RecordId],
        removed: &[RecordId],
    );
}

/// Listener registrations, broadcast in registration order.
pub(crate) struct Listeners<T> {
    pub(crate) insert: Vec<Rc<RefCell<dyn InsertListener<T>>>>,
    pub(crate) filter: Vec<Rc<RefCell<dyn FilterListener<T>>>>,
}

impl<T> Listeners<T> {
    fn new() -> Self {
        Self {
            insert: Vec::new(),
            filter: Vec::new(),
        }
    }
}

/// The multidimensional filtering engine.
///
/// Records are opaque to the engine; dimensions derive sort keys from
/// them through caller-supplied accessors. All operations run
/// synchronously on the calling thread, and consistency across
/// dimensions and groups is a matter of call ordering alone.
///
/// Mutating the engine from inside a listener notification (for example,
/// filtering a dimension from a reduce function) is not supported.
///
/// # Example
///
/// ```rust
/// use sift_engine::Sift;
///
/// #[derive(Clone)]
/// struct Payment {
///     total: i64,
///     kind: &'static str,
/// }
///
/// let data = Sift::with_records(vec![
///     Payment { total: 190, kind: "tab" },
///     Payment { total: 300, kind: "visa" },
///     Payment { total: 90, kind: "cash" },
/// ]);
///
/// let total = data.dimension(|p: &Payment| p.total);
/// let kind = data.dimension(|p: &Payment| p.kind);
///
/// kind.filter_exact("tab");
/// let selected = total.top(usize::MAX);
/// assert_eq!(selected.len(), 1);
/// assert_eq!(selected[0].total, 190);
/// ```
pub struct Sift<T> {
    store: Rc<RefCell<Store<T>>>,
    listeners: Rc<RefCell<Listeners<T>>>,
}

impl<T> Clone for Sift<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            listeners: self.listeners.clone(),
        }
    }
}

impl<T: 'static> Default for Sift<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Sift<T> {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self {
            store: Rc::new(RefCell::new(Store::new())),
            listeners: Rc::new(RefCell::new(Listeners::new())),
        }
    }

    /// Creates an engine seeded with the given records.
    pub fn with_records(records: Vec<T>) -> Self {
        let engine = Self::new();
        engine.add(records);
        engine
    }

    /// Appends records and notifies every dimension and group. A no-op
    /// when the batch is empty.
    ///
    /// A panic from a dimension accessor or reduce function propagates
    /// out of this call and leaves the engine partially updated; callers
    /// must treat that as fatal to the operation.
    pub fn add(&self, records: impl IntoIterator<Item = T>) -> &Self {
        let (n0, n1);
        {
            let mut store = self.store.borrow_mut();
            n0 = store.records.len();
            store.records.extend(records);
            n1 = store.records.len() - n0;
            if n1 == 0 {
                return self;
            }
            store.filters.push_records(n1);
        }

        // All Phase A before any Phase B: a group folds a new record
        // using the full filter mask, which is only complete once every
        // dimension has classified the batch.
        let insert = self.listeners.borrow().insert.clone();
        for listener in &insert {
            let mut store = self.store.borrow_mut();
            listener.borrow_mut().pre_insert(&mut store, n0, n1);
        }
        for listener in &insert {
            let store = self.store.borrow();
            listener.borrow_mut().post_insert(&store, n0, n1);
        }
        self
    }

    /// Returns the number of records, irrespective of any filters.
    pub fn size(&self) -> usize {
        self.store.borrow().len()
    }

    /// Creates a dimension keyed by the given accessor, ingesting all
    /// existing records.
    pub fn dimension<K, F>(&self, accessor: F) -> Dimension<T, K>
    where
        K: Ord + Clone + 'static,
        F: Fn(&T) -> K + 'static,
    {
        Dimension::new(self.store.clone(), self.listeners.clone(), accessor)
    }

    /// Creates a single-aggregate group over the global selection,
    /// counting records until another operator is installed.
    pub fn group_all(&self) -> GroupAll<T, u64> {
        GroupAll::register(self.store.clone(), self.listeners.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_add_and_size() {
        let data = Sift::new();
        assert_eq!(data.size(), 0);
        data.add(vec![1, 2, 3]);
        assert_eq!(data.size(), 3);
        data.add(vec![4]);
        assert_eq!(data.size(), 4);
    }

    #[test]
    fn test_empty_add_is_noop() {
        let data: Sift<i32> = Sift::new();
        data.add(Vec::new());
        assert_eq!(data.size(), 0);
    }

    #[test]
    fn test_with_records() {
        let data = Sift::with_records(vec![10, 20]);
        assert_eq!(data.size(), 2);
    }

    #[test]
    fn test_handle_clone_shares_state() {
        let data = Sift::with_records(vec![1]);
        let other = data.clone();
        other.add(vec![2, 3]);
        assert_eq!(data.size(), 3);
    }
}
