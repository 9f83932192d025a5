//! The deferred finalize step over aggregate results.
//!
//! Some accumulators carry working state rather than the value a reader
//! wants: an average keeps its count and sum, an extents reduction its
//! whole candidate list. `Finalize` is the read-time step from working
//! state to display value. The engine never invokes it; callers apply it
//! at the system boundary, and the container implementations walk
//! arbitrarily nested result shapes until no finalizable leaves remain.

use alloc::vec::Vec;
use sift_engine::GroupEntry;

/// Converts an accumulator into its derived display value.
pub trait Finalize {
    /// The display value.
    type Output;

    /// Consumes the accumulator and produces the display value.
    fn finalize(self) -> Self::Output;
}

macro_rules! finalize_identity {
    ($($t:ty),*) => {
        $(
            impl Finalize for $t {
                type Output = $t;

                fn finalize(self) -> $t {
                    self
                }
            }
        )*
    };
}

// Plain aggregates are already display values.
finalize_identity!(u64, i64, f64, usize);

impl<A: Finalize> Finalize for Vec<A> {
    type Output = Vec<A::Output>;

    fn finalize(self) -> Self::Output {
        self.into_iter().map(Finalize::finalize).collect()
    }
}

impl<A: Finalize> Finalize for Option<A> {
    type Output = Option<A::Output>;

    fn finalize(self) -> Self::Output {
        self.map(Finalize::finalize)
    }
}

impl<A: Finalize, B: Finalize> Finalize for (A, B) {
    type Output = (A::Output, B::Output);

    fn finalize(self) -> Self::Output {
        (self.0.finalize(), self.1.finalize())
    }
}

impl<G, A: Finalize> Finalize for GroupEntry<G, A> {
    type Output = GroupEntry<G, A::Output>;

    fn finalize(self) -> Self::Output {
        GroupEntry {
            key: self.key,
            value: self.value.finalize(),
        }
    }
}
