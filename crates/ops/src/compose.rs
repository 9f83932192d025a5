//! Operator composition: parallel reduction and secondary grouping.

use crate::finalize::Finalize;
use core::hash::Hash;
use hashbrown::HashMap;
use sift_engine::ReduceOp;

/// Runs two operators over the same record stream, bundling their
/// accumulators as a pair. Nest calls for wider bundles:
/// `compose(a, compose(b, c))`.
pub fn compose<A, B>(left: A, right: B) -> Compose<A, B> {
    Compose { left, right }
}

/// See [`compose`].
pub struct Compose<A, B> {
    left: A,
    right: B,
}

impl<T, A, B> ReduceOp<T> for Compose<A, B>
where
    A: ReduceOp<T>,
    B: ReduceOp<T>,
{
    type Acc = (A::Acc, B::Acc);

    fn initial(&self) -> Self::Acc {
        (self.left.initial(), self.right.initial())
    }

    fn add(&self, acc: &mut Self::Acc, record: &T) {
        self.left.add(&mut acc.0, record);
        self.right.add(&mut acc.1, record);
    }

    fn remove(&self, acc: &mut Self::Acc, record: &T) {
        self.left.remove(&mut acc.0, record);
        self.right.remove(&mut acc.1, record);
    }
}

/// Partitions records by an auxiliary key before reducing, one inner
/// accumulator per key value seen.
pub fn by<F, R>(key_fn: F, inner: R) -> By<F, R> {
    By { key_fn, inner }
}

/// See [`by`].
pub struct By<F, R> {
    key_fn: F,
    inner: R,
}

/// The accumulator of [`by`]: one inner accumulator per auxiliary key.
///
/// A key stays present once seen, even when every record carrying it has
/// been folded back out; its inner accumulator then reads as empty.
#[derive(Clone, Debug)]
pub struct ByAcc<G, A> {
    groups: HashMap<G, A>,
}

impl<G: Eq + Hash, A> ByAcc<G, A> {
    /// Returns the inner accumulator for `key`, if that key has been
    /// seen.
    pub fn get(&self, key: &G) -> Option<&A> {
        self.groups.get(key)
    }

    /// Iterates the keys and their inner accumulators in unspecified
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = (&G, &A)> {
        self.groups.iter()
    }

    /// Returns the number of keys seen.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if no key has been seen.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<T, G, F, R> ReduceOp<T> for By<F, R>
where
    G: Eq + Hash + Clone,
    F: Fn(&T) -> G,
    R: ReduceOp<T>,
{
    type Acc = ByAcc<G, R::Acc>;

    fn initial(&self) -> Self::Acc {
        ByAcc {
            groups: HashMap::new(),
        }
    }

    fn add(&self, acc: &mut Self::Acc, record: &T) {
        let key = (self.key_fn)(record);
        let slot = acc
            .groups
            .entry(key)
            .or_insert_with(|| self.inner.initial());
        self.inner.add(slot, record);
    }

    fn remove(&self, acc: &mut Self::Acc, record: &T) {
        let key = (self.key_fn)(record);
        let slot = acc
            .groups
            .entry(key)
            .or_insert_with(|| self.inner.initial());
        self.inner.remove(slot, record);
    }
}

impl<G, A> Finalize for ByAcc<G, A>
where
    G: Eq + Hash,
    A: Finalize,
{
    type Output = HashMap<G, A::Output>;

    fn finalize(self) -> Self::Output {
        self.groups
            .into_iter()
            .map(|(key, acc)| (key, acc.finalize()))
            .collect()
    }
}
