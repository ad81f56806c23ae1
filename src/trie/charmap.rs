//! Character-keyed maps used for trie transitions.
//!
//! Nodes start with [`EmptyCharMap`], switch to the open-addressing
//! [`CharHashMap`] while keys are inserted, and end up as a sorted
//! [`FrozenCharMap`] after compaction. [`Transitions`] dispatches between the
//! three.

use crate::regex::{CompiledRegex, MatchState};
use rayon::prelude::*;
use std::hash::BuildHasher;
use thiserror::Error;

/// Maps at or below this size are scanned linearly.
const LINEAR_SCAN_LIMIT: usize = 8;
const INITIAL_CAPACITY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CharMapError {
    #[error("cannot insert key {0:?} into an immutable char map")]
    Immutable(char),
}

pub(crate) trait CharMap<V> {
    fn get(&self, key: char) -> Option<&V>;

    fn put(&mut self, key: char, value: V) -> Result<Option<V>, CharMapError>;

    fn len(&self) -> usize;

    fn for_each(&self, f: impl FnMut(char, &V));

    /// Maps every entry on the current rayon pool.
    fn par_map<R, F>(&self, f: F) -> Vec<(char, R)>
    where
        V: Sync,
        R: Send,
        F: Fn(char, &V) -> R + Sync + Send;

    fn contains_key(&self, key: char) -> bool {
        self.get(key).is_some()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Steps `state` over every key and hands each live result to `f`.
    fn step_all(&self, matcher: &CompiledRegex, state: MatchState, mut f: impl FnMut(MatchState, &V)) {
        self.for_each(|c, value| {
            let next = matcher.step(c, state);
            if next.is_ok() {
                f(next, value);
            }
        });
    }
}

/// Map without entries that rejects every insertion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct EmptyCharMap;

impl<V> CharMap<V> for EmptyCharMap {
    fn get(&self, _key: char) -> Option<&V> {
        None
    }

    fn put(&mut self, key: char, _value: V) -> Result<Option<V>, CharMapError> {
        Err(CharMapError::Immutable(key))
    }

    fn len(&self) -> usize {
        0
    }

    fn for_each(&self, _f: impl FnMut(char, &V)) {}

    fn par_map<R, F>(&self, _f: F) -> Vec<(char, R)>
    where
        V: Sync,
        R: Send,
        F: Fn(char, &V) -> R + Sync + Send,
    {
        Vec::new()
    }
}

/// Open-addressing map with linear probing and a power-of-two table.
#[derive(Debug, Clone)]
pub(crate) struct CharHashMap<V> {
    slots: Box<[Option<(char, V)>]>,
    len: usize,
}

impl<V> Default for CharHashMap<V> {
    fn default() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }
}

impl<V> CharHashMap<V> {
    fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.next_power_of_two().max(INITIAL_CAPACITY);
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            len: 0,
        }
    }

    fn slot_of(&self, key: char) -> usize {
        // Fibonacci hashing spreads consecutive code points across the table.
        let hash = u64::from(key).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        (hash >> (64 - self.slots.len().trailing_zeros())) as usize
    }

    /// Index of the slot holding `key`, or of the empty slot where it belongs.
    fn probe(&self, key: char) -> usize {
        let mask = self.slots.len() - 1;
        let mut index = self.slot_of(key);
        while let Some((existing, _)) = &self.slots[index] {
            if *existing == key {
                break;
            }
            index = (index + 1) & mask;
        }
        index
    }

    fn grow(&mut self) {
        let capacity = self.slots.len() * 2;
        let old = std::mem::replace(self, Self::with_capacity(capacity));
        for (key, value) in old.slots.into_vec().into_iter().flatten() {
            let index = self.probe(key);
            self.slots[index] = Some((key, value));
            self.len += 1;
        }
    }

    fn iter(&self) -> impl Iterator<Item = (char, &V)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|(key, value)| (*key, value)))
    }
}

impl<V> CharMap<V> for CharHashMap<V> {
    fn get(&self, key: char) -> Option<&V> {
        self.slots[self.probe(key)].as_ref().map(|(_, value)| value)
    }

    fn put(&mut self, key: char, value: V) -> Result<Option<V>, CharMapError> {
        if (self.len + 1) * 4 > self.slots.len() * 3 {
            self.grow();
        }
        let index = self.probe(key);
        match &mut self.slots[index] {
            Some((_, existing)) => Ok(Some(std::mem::replace(existing, value))),
            empty => {
                *empty = Some((key, value));
                self.len += 1;
                Ok(None)
            }
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn for_each(&self, mut f: impl FnMut(char, &V)) {
        for (key, value) in self.iter() {
            f(key, value);
        }
    }

    fn par_map<R, F>(&self, f: F) -> Vec<(char, R)>
    where
        V: Sync,
        R: Send,
        F: Fn(char, &V) -> R + Sync + Send,
    {
        let entries: Vec<_> = self.iter().collect();
        entries
            .into_par_iter()
            .map(|(key, value)| (key, f(key, value)))
            .collect()
    }
}

/// Sorted, read-optimized map built once from finished entries.
#[derive(Debug, Clone)]
pub(crate) struct FrozenCharMap<V> {
    keys: Box<[char]>,
    values: Box<[V]>,
}

impl<V> FrozenCharMap<V> {
    pub(crate) fn from_entries(mut entries: Vec<(char, V)>) -> Self {
        entries.sort_unstable_by_key(|(key, _)| *key);
        let (keys, values): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
        Self {
            keys: keys.into_boxed_slice(),
            values: values.into_boxed_slice(),
        }
    }

    fn index_of(&self, key: char) -> Option<usize> {
        if self.keys.len() <= LINEAR_SCAN_LIMIT {
            self.keys.iter().position(|k| *k == key)
        } else {
            self.keys.binary_search(&key).ok()
        }
    }
}

impl<V> CharMap<V> for FrozenCharMap<V> {
    fn get(&self, key: char) -> Option<&V> {
        self.index_of(key).map(|index| &self.values[index])
    }

    /// Only replaces values of existing keys.
    fn put(&mut self, key: char, value: V) -> Result<Option<V>, CharMapError> {
        let index = self.index_of(key).ok_or(CharMapError::Immutable(key))?;
        Ok(Some(std::mem::replace(&mut self.values[index], value)))
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn for_each(&self, mut f: impl FnMut(char, &V)) {
        for (key, value) in self.keys.iter().zip(self.values.iter()) {
            f(*key, value);
        }
    }

    fn par_map<R, F>(&self, f: F) -> Vec<(char, R)>
    where
        V: Sync,
        R: Send,
        F: Fn(char, &V) -> R + Sync + Send,
    {
        self.keys
            .par_iter()
            .zip(self.values.par_iter())
            .map(|(key, value)| (*key, f(*key, value)))
            .collect()
    }
}

/// Transition map of a trie node in one of its three lifecycle stages.
#[derive(Debug, Clone)]
pub(crate) enum Transitions<V> {
    Empty,
    Mutable(CharHashMap<V>),
    Frozen(FrozenCharMap<V>),
}

impl<V> Default for Transitions<V> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<V> Transitions<V> {
    /// Inserts a transition, switching from the empty map to a mutable one.
    pub(crate) fn insert(&mut self, key: char, value: V) -> Result<Option<V>, CharMapError> {
        if matches!(self, Self::Empty) {
            *self = Self::Mutable(CharHashMap::default());
        }
        self.put(key, value)
    }

    /// Builds the frozen form, or the empty map when there are no entries.
    pub(crate) fn frozen(entries: Vec<(char, V)>) -> Self {
        if entries.is_empty() {
            Self::Empty
        } else {
            Self::Frozen(FrozenCharMap::from_entries(entries))
        }
    }

    /// Order-independent hash over keys and value hashes.
    pub(crate) fn content_hash(&self, hasher: &impl BuildHasher, value_hash: impl Fn(&V) -> u64) -> u64 {
        let mut sum = 0u64;
        self.for_each(|key, value| {
            let entry = hasher
                .hash_one(key)
                .wrapping_mul(31)
                .wrapping_add(value_hash(value));
            sum = sum.wrapping_add(entry);
        });
        sum
    }

    /// Order-independent equality using `value_eq` for the values.
    pub(crate) fn content_eq(&self, other: &Self, value_eq: impl Fn(&V, &V) -> bool) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut equal = true;
        self.for_each(|key, value| {
            equal = equal && other.get(key).is_some_and(|theirs| value_eq(value, theirs));
        });
        equal
    }
}

impl<V> CharMap<V> for Transitions<V> {
    fn get(&self, key: char) -> Option<&V> {
        match self {
            Self::Empty => CharMap::<V>::get(&EmptyCharMap, key),
            Self::Mutable(map) => map.get(key),
            Self::Frozen(map) => map.get(key),
        }
    }

    fn put(&mut self, key: char, value: V) -> Result<Option<V>, CharMapError> {
        match self {
            Self::Empty => EmptyCharMap.put(key, value),
            Self::Mutable(map) => map.put(key, value),
            Self::Frozen(map) => map.put(key, value),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Mutable(map) => map.len(),
            Self::Frozen(map) => map.len(),
        }
    }

    fn for_each(&self, f: impl FnMut(char, &V)) {
        match self {
            Self::Empty => {}
            Self::Mutable(map) => map.for_each(f),
            Self::Frozen(map) => map.for_each(f),
        }
    }

    fn par_map<R, F>(&self, f: F) -> Vec<(char, R)>
    where
        V: Sync,
        R: Send,
        F: Fn(char, &V) -> R + Sync + Send,
    {
        match self {
            Self::Empty => Vec::new(),
            Self::Mutable(map) => map.par_map(f),
            Self::Frozen(map) => map.par_map(f),
        }
    }
}
