//! Rank-ordered merge of the value sets found by a fuzzy search.

use ahash::AHashSet;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use super::TrieValue;

/// A value with a fixed insertion weight.
///
/// The value's `Ord` must put higher weights first, so that a sorted value
/// set is also sorted by rank.
pub trait Ranked {
    fn weight(&self) -> f64;
}

/// Values that matched with the same grade at one trie node.
#[derive(Debug, Clone)]
pub struct GradedValueSet<T> {
    values: Arc<[T]>,
    grade: f64,
}

impl<T> GradedValueSet<T> {
    pub(crate) fn new(values: Arc<[T]>, grade: f64) -> Self {
        Self { values, grade }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub const fn grade(&self) -> f64 {
        self.grade
    }
}

impl<T> PartialEq for GradedValueSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for GradedValueSet<T> {}

impl<T> PartialOrd for GradedValueSet<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Higher grades sort first.
impl<T> Ord for GradedValueSet<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.grade.total_cmp(&self.grade)
    }
}

/// Position inside one graded set, ordered for the max-heap.
struct Cursor<T> {
    set: GradedValueSet<T>,
    position: usize,
    rank: f64,
}

impl<T: Ranked> Cursor<T> {
    fn new(set: GradedValueSet<T>) -> Option<Self> {
        let rank = set.values.first()?.weight() + set.grade;
        Some(Self {
            set,
            position: 0,
            rank,
        })
    }

    fn head(&self) -> &T {
        &self.set.values[self.position]
    }

    fn advance(mut self) -> Option<Self> {
        self.position += 1;
        let next = self.set.values.get(self.position)?;
        self.rank = next.weight() + self.set.grade;
        Some(self)
    }
}

impl<T: Ranked + Ord> PartialEq for Cursor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ranked + Ord> Eq for Cursor<T> {}

impl<T: Ranked + Ord> PartialOrd for Cursor<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ranked + Ord> Ord for Cursor<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // higher rank first, then the smaller value
        self.rank
            .total_cmp(&other.rank)
            .then_with(|| other.head().cmp(self.head()))
    }
}

/// Lazy, strictly rank-descending and duplicate-free stream of values.
pub struct RankedResults<T> {
    heap: BinaryHeap<Cursor<T>>,
    seen: AHashSet<T>,
}

impl<T: TrieValue + Ranked> RankedResults<T> {
    pub fn new(sets: impl IntoIterator<Item = GradedValueSet<T>>) -> Self {
        Self {
            heap: sets.into_iter().filter_map(Cursor::new).collect(),
            seen: AHashSet::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new([])
    }

    /// The next value together with its rank.
    pub fn next_ranked(&mut self) -> Option<(T, f64)> {
        loop {
            let cursor = self.heap.pop()?;
            let value = cursor.head().clone();
            let rank = cursor.rank;
            if let Some(cursor) = cursor.advance() {
                self.heap.push(cursor);
            }
            if self.seen.insert(value.clone()) {
                return Some((value, rank));
            }
        }
    }
}

impl<T: TrieValue + Ranked> Iterator for RankedResults<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.next_ranked().map(|(value, _)| value)
    }
}
