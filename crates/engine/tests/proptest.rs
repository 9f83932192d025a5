//! Property-based tests for sift-engine using proptest.
//!
//! The engine is driven through random interleavings of filter changes
//! and inserts, and every observation is checked against a from-scratch
//! model over plain vectors.

use proptest::prelude::*;
use sift_engine::{FilterSpec, Sift};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
enum ModelFilter {
    All,
    Exact(i64),
    Range(i64, i64),
}

impl ModelFilter {
    fn selects(&self, v: i64) -> bool {
        match self {
            ModelFilter::All => true,
            ModelFilter::Exact(x) => v == *x,
            ModelFilter::Range(lo, hi) => *lo <= v && v < *hi,
        }
    }

    fn spec(&self) -> FilterSpec<i64> {
        match self {
            ModelFilter::All => FilterSpec::All,
            ModelFilter::Exact(x) => FilterSpec::Exact(*x),
            ModelFilter::Range(lo, hi) => FilterSpec::Range(*lo, *hi),
        }
    }
}

#[derive(Clone, Debug)]
enum Op {
    FilterA(ModelFilter),
    FilterB(ModelFilter),
    Add(Vec<(i64, i64)>),
}

fn model_filter() -> impl Strategy<Value = ModelFilter> {
    prop_oneof![
        Just(ModelFilter::All),
        (0..30i64).prop_map(ModelFilter::Exact),
        (0..30i64, 0..30i64).prop_map(|(a, b)| ModelFilter::Range(a.min(b), a.max(b))),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        model_filter().prop_map(Op::FilterA),
        model_filter().prop_map(Op::FilterB),
        prop::collection::vec((0..30i64, 0..30i64), 1..6).prop_map(Op::Add),
    ]
}

proptest! {
    /// Incrementally maintained aggregates equal a from-scratch refold
    /// after any interleaving of filter changes and inserts, and the
    /// groups always partition the full record set.
    #[test]
    fn incremental_matches_from_scratch(
        records in prop::collection::vec((0..30i64, 0..30i64), 1..30),
        ops in prop::collection::vec(op(), 0..10),
    ) {
        let data = Sift::with_records(records.clone());
        let a = data.dimension(|r: &(i64, i64)| r.0);
        let b = data.dimension(|r: &(i64, i64)| r.1);
        let counts = a.group_values();
        let total = data.group_all();

        let mut model = records;
        let mut fa = ModelFilter::All;
        let mut fb = ModelFilter::All;

        for op in ops {
            match op {
                Op::FilterA(f) => { a.filter(f.spec()); fa = f; }
                Op::FilterB(f) => { b.filter(f.spec()); fb = f; }
                Op::Add(batch) => { data.add(batch.clone()); model.extend(batch); }
            }

            // Every key appears in the group array regardless of the
            // filters; only selected records are counted.
            let mut expected: BTreeMap<i64, u64> = model.iter().map(|r| (r.0, 0)).collect();
            let mut selected = 0u64;
            for r in &model {
                if fa.selects(r.0) && fb.selects(r.1) {
                    *expected.get_mut(&r.0).unwrap() += 1;
                    selected += 1;
                }
            }
            let got: BTreeMap<i64, u64> =
                counts.all().into_iter().map(|e| (e.key, e.value)).collect();
            prop_assert_eq!(got, expected);
            prop_assert_eq!(total.value(), selected);

            // The dimension's own walk of the selection agrees,
            // descending by key with later-inserted ties first.
            let mut sel: Vec<(usize, (i64, i64))> = model
                .iter()
                .copied()
                .enumerate()
                .filter(|(_, r)| fa.selects(r.0) && fb.selects(r.1))
                .collect();
            sel.sort_by_key(|&(id, r)| (r.0, id));
            sel.reverse();
            let expected_top: Vec<(i64, i64)> = sel.into_iter().map(|(_, r)| r).collect();
            prop_assert_eq!(a.top(usize::MAX), expected_top);
        }
    }

    /// Filtering and then clearing the filter restores selections and
    /// aggregates exactly.
    #[test]
    fn filter_round_trip(
        records in prop::collection::vec((0..20i64, 0..20i64), 1..30),
        v in 0..20i64,
    ) {
        let data = Sift::with_records(records);
        let a = data.dimension(|r: &(i64, i64)| r.0);
        let b = data.dimension(|r: &(i64, i64)| r.1);
        let counts = b.group_values();

        let groups_before = counts.all();
        let top_before = b.top(usize::MAX);

        a.filter_exact(v);
        a.filter_all();

        prop_assert_eq!(counts.all(), groups_before);
        prop_assert_eq!(b.top(usize::MAX), top_before);
    }

    /// Applying the same filter twice is the same as applying it once.
    #[test]
    fn filter_idempotent(
        records in prop::collection::vec((0..20i64, 0..20i64), 1..30),
        lo in 0..20i64,
        span in 0..20i64,
    ) {
        let data = Sift::with_records(records);
        let a = data.dimension(|r: &(i64, i64)| r.0);
        let b = data.dimension(|r: &(i64, i64)| r.1);
        let counts = b.group_values();

        a.filter_range(lo, lo + span);
        let groups_once = counts.all();
        let top_once = b.top(usize::MAX);

        a.filter_range(lo, lo + span);
        prop_assert_eq!(counts.all(), groups_once);
        prop_assert_eq!(b.top(usize::MAX), top_once);
    }

    /// Splitting an insert into two batches yields the same index,
    /// selections, and aggregates as one batch.
    #[test]
    fn insertion_order_independence(
        records in prop::collection::vec((0..20i64, 0..20i64), 1..30),
        cut in 0usize..30,
    ) {
        let cut = cut.min(records.len());

        let whole = Sift::with_records(records.clone());
        let a1 = whole.dimension(|r: &(i64, i64)| r.0);
        let g1 = a1.group_values();

        let split = Sift::new();
        let a2 = split.dimension(|r: &(i64, i64)| r.0);
        let g2 = a2.group_values();
        split.add(records[..cut].to_vec());
        split.add(records[cut..].to_vec());

        prop_assert_eq!(a1.top(usize::MAX), a2.top(usize::MAX));
        prop_assert_eq!(g1.all(), g2.all());

        // And with a filter active while the second batch arrives.
        a1.filter_range(5, 15);
        a2.filter_range(5, 15);
        prop_assert_eq!(a1.top(usize::MAX), a2.top(usize::MAX));
        prop_assert_eq!(g1.all(), g2.all());
    }
}
