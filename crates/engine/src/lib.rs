//! Sift Engine - multidimensional filtering with incremental aggregation.
//!
//! This crate provides the engine core:
//!
//! - `Sift`: the record store and entry point; records are opaque and
//!   append-only
//! - `Dimension`: a derived sort key over the records, independently
//!   filterable, with an incrementally merged sorted index
//! - `Group` / `GroupAll`: discrete key partitions whose aggregates are
//!   folded incrementally through a `ReduceOp` as filters change
//! - `FilterSpec` / `FilterTerm`: the tagged filter forms a dimension
//!   accepts
//!
//! Every operation costs O(affected records), not O(total records): a
//! filter change is diffed against the previous selection in rank-interval
//! space, and only the records in the delta are re-folded by groups.
//!
//! The engine is single-threaded and fully synchronous. Consistency is a
//! matter of call ordering alone: on insert, every dimension classifies
//! the batch before any group binds it to keys; on filter change,
//! listeners run in registration order. Mutating the engine from inside a
//! notification is not supported.
//!
//! # Example
//!
//! ```rust
//! use sift_engine::Sift;
//!
//! let data = Sift::with_records(vec![(1i64, "tab"), (2, "visa"), (3, "tab")]);
//! let amount = data.dimension(|r: &(i64, &str)| r.0);
//! let kind = data.dimension(|r: &(i64, &str)| r.1);
//!
//! let by_kind = kind.group_values();
//! let selected = data.group_all();
//!
//! amount.filter_range(2, 10);
//! assert_eq!(selected.value(), 2);
//!
//! let counts = by_kind.all();
//! assert_eq!(counts[0].key, "tab");
//! assert_eq!(counts[0].value, 1);
//! assert_eq!(counts[1].key, "visa");
//! assert_eq!(counts[1].value, 1);
//! ```

#![no_std]

extern crate alloc;

mod dimension;
mod filter;
mod group;
mod group_all;
mod reduce;
mod store;

pub use dimension::Dimension;
pub use filter::{FilterSpec, FilterTerm};
pub use group::{Group, GroupEntry};
pub use group_all::GroupAll;
pub use reduce::{Count, ReduceFn, ReduceOp, Sum};
pub use store::{RecordId, Sift, Store};
