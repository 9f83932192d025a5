//! Sift Ops - the reduce-operator library for the sift engine.
//!
//! Everything here is built on the engine's `ReduceOp` contract; the
//! engine only folds accumulators and never depends on these concrete
//! operators.
//!
//! - `count()` / `sum(f)`: plain counting and summing
//! - `average(f)`: count and sum together, averaged at read time
//! - `extents(f)`: minimum and maximum of the selected values
//! - `compose(a, b)`: run two operators over the same record stream,
//!   bundling their accumulators as a pair
//! - `by(key, op)`: partition records by an auxiliary key before
//!   reducing
//! - `Finalize`: the deferred display-value step, walked recursively
//!   over result trees at the system boundary
//!
//! # Example
//!
//! ```rust
//! use sift_engine::Sift;
//! use sift_ops::{average, Finalize};
//!
//! let data = Sift::with_records(vec![10.0f64, 20.0, 30.0]);
//! let avg = data.group_all().reduce(average(|v: &f64| *v));
//! assert_eq!(avg.value().finalize(), 20.0);
//! ```

#![no_std]

extern crate alloc;

mod compose;
mod finalize;
mod reducers;

pub use compose::{by, compose, By, ByAcc, Compose};
pub use finalize::Finalize;
pub use reducers::{average, count, extents, sum, Average, AverageAcc, Extents, ExtentsAcc};

// The engine's own operators, re-exported so callers need one import.
pub use sift_engine::{Count, ReduceFn, ReduceOp, Sum};
