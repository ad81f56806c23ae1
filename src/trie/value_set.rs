//! Values terminating at a trie node.

use ahash::AHashSet;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use super::TrieError;

/// Most nodes hold zero or one value, so those cases avoid a hash set.
#[derive(Debug, Clone)]
pub(crate) enum ValueSet<T> {
    Empty,
    Single(T),
    Many(AHashSet<T>),
    /// Sorted, read-only form shared through the compaction cache.
    Frozen(Arc<[T]>),
}

impl<T> Default for ValueSet<T> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<T: Clone + Eq + Hash + Ord> ValueSet<T> {
    /// Adds a value, returning whether it was not present yet.
    pub(crate) fn insert(&mut self, value: T) -> Result<bool, TrieError> {
        match self {
            Self::Empty => *self = Self::Single(value),
            Self::Single(existing) => {
                if *existing == value {
                    return Ok(false);
                }
                let mut set = AHashSet::with_capacity(2);
                set.insert(existing.clone());
                set.insert(value);
                *self = Self::Many(set);
            }
            Self::Many(set) => return Ok(set.insert(value)),
            Self::Frozen(_) => return Err(TrieError::Immutable),
        }
        Ok(true)
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Single(_) => 1,
            Self::Many(set) => set.len(),
            Self::Frozen(values) => values.len(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn contains(&self, value: &T) -> bool {
        match self {
            Self::Empty => false,
            Self::Single(existing) => existing == value,
            Self::Many(set) => set.contains(value),
            Self::Frozen(values) => values.binary_search(value).is_ok(),
        }
    }

    /// The values in ascending order.
    pub(crate) fn to_sorted(&self) -> Arc<[T]> {
        match self {
            Self::Frozen(values) => Arc::clone(values),
            Self::Empty => Arc::from([]),
            Self::Single(value) => Arc::from([value.clone()]),
            Self::Many(set) => {
                let mut values: Vec<T> = set.iter().cloned().collect();
                values.sort_unstable();
                values.into()
            }
        }
    }

    /// Switches to the frozen form, letting `intern` substitute a shared copy.
    pub(crate) fn freeze(&mut self, intern: impl FnOnce(Arc<[T]>) -> Arc<[T]>) {
        if !self.is_empty() && !matches!(self, Self::Frozen(_)) {
            *self = Self::Frozen(intern(self.to_sorted()));
        }
    }

    /// Order-independent hash of the contained values.
    pub(crate) fn content_hash(&self, hasher: &impl BuildHasher) -> u64 {
        let mut sum = 0u64;
        let mut add = |value: &T| sum = sum.wrapping_add(hasher.hash_one(value));
        match self {
            Self::Empty => {}
            Self::Single(value) => add(value),
            Self::Many(set) => set.iter().for_each(add),
            Self::Frozen(values) => values.iter().for_each(add),
        }
        sum
    }

    pub(crate) fn content_eq(&self, other: &Self) -> bool {
        if let (Self::Frozen(a), Self::Frozen(b)) = (self, other) {
            return Arc::ptr_eq(a, b) || a == b;
        }
        self.len() == other.len() && self.to_sorted().iter().all(|value| other.contains(value))
    }
}
