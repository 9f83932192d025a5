//! Sift Core - dependency-free primitives for the sift engine.
//!
//! This crate provides the leaf building blocks the engine is assembled
//! from:
//!
//! - `RankInterval` and the interval algebra (`coalesce`, `diff`): sorted,
//!   disjoint half-open intervals over ranks in a dimension's sort order,
//!   and the minimal add/remove delta between two selections
//! - `FilterMask`: per-dimension exclusion bit lanes over the record set
//! - `bisect`: lower/upper bound bisection over sorted slices
//! - `top_k`: bounded partial selection under a comparator
//!
//! # Example
//!
//! ```rust
//! use sift_core::{coalesce, diff, RankInterval};
//!
//! let old = vec![RankInterval::new(0, 10)];
//! let new = coalesce(vec![RankInterval::new(2, 5), RankInterval::new(8, 12)]);
//! let (added, removed) = diff(&old, &new);
//!
//! assert_eq!(added, vec![RankInterval::new(10, 12)]);
//! assert_eq!(removed, vec![RankInterval::new(0, 2), RankInterval::new(5, 8)]);
//! ```

#![no_std]

extern crate alloc;

pub mod bisect;
pub mod bitset;
pub mod interval;
pub mod select;

pub use bisect::{lower_bound, upper_bound};
pub use bitset::{DimensionId, FilterMask};
pub use interval::{coalesce, diff, is_sorted_disjoint, RankInterval};
pub use select::top_k;
