//! Structural sharing across tries during compaction.

use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::TrieValue;
use super::node::Node;

/// Interns frozen nodes, value sets and labels.
///
/// Several tries built from overlapping entries (the combined trie and the
/// per-category tries) are compressed against the same cache so identical
/// subtrees end up as one shared allocation. Safe to use from many
/// compaction workers at once.
pub struct CompactionCache<T> {
    nodes: DashMap<InternedNode<T>, (), RandomState>,
    values: DashMap<Arc<[T]>, (), RandomState>,
    labels: DashMap<Arc<str>, (), RandomState>,
}

/// Entry counts of a [`CompactionCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub nodes: usize,
    pub value_sets: usize,
    pub labels: usize,
}

impl<T: TrieValue> Default for CompactionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TrieValue> CompactionCache<T> {
    pub fn new() -> Self {
        Self {
            nodes: DashMap::with_hasher(RandomState::new()),
            values: DashMap::with_hasher(RandomState::new()),
            labels: DashMap::with_hasher(RandomState::new()),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            nodes: self.nodes.len(),
            value_sets: self.values.len(),
            labels: self.labels.len(),
        }
    }

    /// Returns the cached node equal to `node`, caching `node` if there is none.
    pub(crate) fn node(&self, node: Arc<Node<T>>) -> Arc<Node<T>> {
        intern(&self.nodes, InternedNode(node)).0
    }

    pub(crate) fn values(&self, values: Arc<[T]>) -> Arc<[T]> {
        intern(&self.values, values)
    }

    pub(crate) fn label(&self, label: &Arc<str>) -> Arc<str> {
        if let Some(cached) = self.labels.get(label) {
            return Arc::clone(cached.key());
        }
        intern(&self.labels, Arc::clone(label))
    }
}

fn intern<K: Hash + Eq + Clone>(map: &DashMap<K, (), RandomState>, key: K) -> K {
    match map.entry(key) {
        Entry::Occupied(occupied) => occupied.key().clone(),
        Entry::Vacant(vacant) => {
            let key = vacant.key().clone();
            vacant.insert(());
            key
        }
    }
}

/// Node wrapper comparing by content instead of identity.
struct InternedNode<T>(Arc<Node<T>>);

impl<T> Clone for InternedNode<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: TrieValue> PartialEq for InternedNode<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.content_eq(&other.0)
    }
}

impl<T: TrieValue> Eq for InternedNode<T> {}

impl<T: TrieValue> Hash for InternedNode<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.content_hash());
    }
}
