//! Trie nodes and the lock guards used to access them.

use ahash::RandomState;
use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr;
use std::sync::{Arc, OnceLock};

use super::TrieValue;
use super::charmap::{CharMap, Transitions};
use super::lock::NodeLock;
use super::value_set::ValueSet;
use super::{CompactionCache, TrieError};

/// Fixed seeds keep content hashes comparable between tries.
fn content_hasher() -> RandomState {
    RandomState::with_seeds(
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    )
}

pub(crate) struct NodeData<T> {
    pub(crate) label: Arc<str>,
    pub(crate) values: ValueSet<T>,
    pub(crate) transitions: Transitions<Arc<Node<T>>>,
}

/// A trie node. Its data may only be touched through a [`LockedNode`].
pub(crate) struct Node<T> {
    lock: NodeLock,
    /// Set once the node is frozen.
    hash: OnceLock<u64>,
    data: UnsafeCell<NodeData<T>>,
}

// SAFETY: `data` is only reached through `LockedNode`, which holds the node's
// read lock for shared and its write lock for mutable access. After the lock is
// deactivated the data is never mutated again.
unsafe impl<T: Send + Sync> Send for Node<T> {}
unsafe impl<T: Send + Sync> Sync for Node<T> {}

impl<T> Node<T> {
    pub(crate) fn new(label: Arc<str>, values: ValueSet<T>) -> Self {
        Self::with_transitions(label, values, Transitions::Empty)
    }

    fn with_transitions(
        label: Arc<str>,
        values: ValueSet<T>,
        transitions: Transitions<Arc<Self>>,
    ) -> Self {
        Self {
            lock: NodeLock::new(),
            hash: OnceLock::new(),
            data: UnsafeCell::new(NodeData {
                label,
                values,
                transitions,
            }),
        }
    }

    pub(crate) fn is_frozen(&self) -> bool {
        !self.lock.is_active()
    }
}

impl<T: TrieValue> Node<T> {
    /// Hash over the reachable content, cached once the node is frozen.
    pub(crate) fn content_hash(&self) -> u64 {
        if let Some(hash) = self.hash.get() {
            return *hash;
        }
        LockedNode::read(self).content_hash(&content_hasher())
    }

    /// Structural equality over the reachable content.
    pub(crate) fn content_eq(&self, other: &Self) -> bool {
        if ptr::eq(self, other) {
            return true;
        }
        if let (Some(a), Some(b)) = (self.hash.get(), other.hash.get())
            && a != b
        {
            return false;
        }
        let ours = LockedNode::read(self);
        let theirs = LockedNode::read(other);
        ours.label == theirs.label
            && ours.values.content_eq(&theirs.values)
            && ours
                .transitions
                .content_eq(&theirs.transitions, |a, b| a.content_eq(b))
    }

    /// Freezes this node and its subtree, returning the shared instance from
    /// the cache. `parallel` compacts children on the current rayon pool.
    pub(crate) fn compress(
        self: &Arc<Self>,
        cache: &CompactionCache<T>,
        parallel: bool,
    ) -> Result<Arc<Self>, TrieError> {
        let mut node = LockedNode::write(&**self);
        let data = node.data_mut();

        let transitions = std::mem::take(&mut data.transitions);
        let compressed = if transitions.is_empty() {
            Vec::new()
        } else if parallel {
            transitions.par_map(|_, child| child.compress(cache, parallel))
        } else {
            let mut compressed = Vec::with_capacity(transitions.len());
            transitions.for_each(|c, child| compressed.push((c, child.compress(cache, parallel))));
            compressed
        };
        let children = compressed
            .into_iter()
            .map(|(c, child)| child.map(|child| (c, child)))
            .collect::<Result<Vec<_>, _>>()?;

        data.transitions = Transitions::frozen(children);
        data.label = cache.label(&data.label);
        data.values.freeze(|sorted| cache.values(sorted));
        let hash = data.content_hash(&content_hasher());
        drop(node);

        // A node is compressed once, so the hash is unset here.
        let _ = self.hash.set(hash);
        self.lock.deactivate();
        Ok(cache.node(Arc::clone(self)))
    }
}

impl<T: TrieValue> NodeData<T> {
    fn content_hash(&self, hasher: &RandomState) -> u64 {
        let label = hasher.hash_one(&*self.label);
        let values = self.values.content_hash(hasher);
        let transitions = self
            .transitions
            .content_hash(hasher, |child| child.content_hash());
        label
            .wrapping_mul(31)
            .wrapping_add(values)
            .wrapping_mul(31)
            .wrapping_add(transitions)
    }

    /// Splits the label at byte offset `at`, moving the tail, the values and
    /// the transitions into a new child.
    fn split(&mut self, at: usize) -> Result<(), TrieError> {
        let Some(c) = self.label[at..].chars().next() else {
            return Ok(());
        };
        let tail = Node::with_transitions(
            Arc::from(&self.label[at + c.len_utf8()..]),
            std::mem::take(&mut self.values),
            std::mem::take(&mut self.transitions),
        );

        self.label = Arc::from(&self.label[..at]);
        self.transitions.insert(c, Arc::new(tail))?;
        Ok(())
    }

    /// Adds `value` for `key` at the position a lookup stopped at.
    pub(crate) fn insert(
        &mut self,
        key: &str,
        index_in_key: usize,
        index_in_node: usize,
        value: T,
    ) -> Result<(), TrieError> {
        if index_in_node != self.label.len() {
            self.split(index_in_node)?;
        }
        let rest = &key[index_in_key..];
        match rest.chars().next() {
            None => {
                self.values.insert(value)?;
            }
            Some(c) => {
                // the lookup descends through existing children
                if self.transitions.contains_key(c) {
                    return Err(TrieError::TraversalInvariant { key: key.to_owned() });
                }
                let child = Node::new(Arc::from(&rest[c.len_utf8()..]), ValueSet::Single(value));
                self.transitions.insert(c, Arc::new(child))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

/// Lock guard over a node, generic over how the node is referenced.
///
/// Lookups walking down for an insertion own their nodes through `Arc` so a
/// child can be locked before the parent is released; recursive searches
/// borrow them.
pub(crate) struct LockedNode<P: Deref<Target = Node<T>>, T> {
    node: P,
    access: Access,
    _value: PhantomData<fn() -> T>,
}

impl<P: Deref<Target = Node<T>>, T> LockedNode<P, T> {
    pub(crate) fn read(node: P) -> Self {
        node.lock.start_read();
        Self {
            node,
            access: Access::Read,
            _value: PhantomData,
        }
    }

    pub(crate) fn write(node: P) -> Self {
        node.lock.start_write();
        Self {
            node,
            access: Access::Write,
            _value: PhantomData,
        }
    }

    pub(crate) fn is_write(&self) -> bool {
        self.access == Access::Write
    }

    /// Trades the read lock for the write lock. The node may change in between.
    pub(crate) fn upgrade(&mut self) {
        if self.access == Access::Read {
            self.node.lock.end_read();
            self.node.lock.start_write();
            self.access = Access::Write;
        }
    }

    pub(crate) fn data_mut(&mut self) -> &mut NodeData<T> {
        assert!(self.is_write(), "mutable node access without the write lock");
        // SAFETY: the write lock is held, so no other guard can observe the data.
        unsafe { &mut *self.node.data.get() }
    }
}

impl<P: Deref<Target = Node<T>>, T> Deref for LockedNode<P, T> {
    type Target = NodeData<T>;

    fn deref(&self) -> &NodeData<T> {
        // SAFETY: a read or write lock is held for the guard's lifetime, or the
        // node is frozen and immutable.
        unsafe { &*self.node.data.get() }
    }
}

impl<P: Deref<Target = Node<T>>, T> DerefMut for LockedNode<P, T> {
    fn deref_mut(&mut self) -> &mut NodeData<T> {
        self.data_mut()
    }
}

impl<P: Deref<Target = Node<T>>, T> Drop for LockedNode<P, T> {
    fn drop(&mut self) {
        match self.access {
            Access::Read => self.node.lock.end_read(),
            Access::Write => self.node.lock.end_write(),
        }
    }
}
