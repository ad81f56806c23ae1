//! Compressed-label trie that is built concurrently and then frozen.
//!
//! A [`Trie`] goes through two phases. While building, any number of threads
//! may call [`Trie::insert`]; every node carries a small spin lock and inserts
//! walk the trie hand-over-hand under read locks, upgrading to a write lock
//! only at the node they change. [`Trie::compress`] then freezes all nodes,
//! disables the locks and shares identical subtrees through a
//! [`CompactionCache`]. After that, lookups need no synchronization at all.

mod cache;
mod charmap;
mod lock;
mod node;
mod ranked;
mod value_set;

pub use cache::{CacheStats, CompactionCache};
pub use charmap::CharMapError;
pub use ranked::{GradedValueSet, Ranked, RankedResults};

use crate::regex::{CompiledRegex, MatchState};
use charmap::CharMap;
use node::{LockedNode, Node};
use rayon::ThreadPool;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;
use value_set::ValueSet;

/// Bounds shared by everything stored in a trie.
pub trait TrieValue: Clone + Eq + Hash + Ord + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + Ord + Send + Sync + 'static> TrieValue for T {}

#[derive(Debug, Error)]
pub enum TrieError {
    #[error("trie is compressed and can no longer be modified")]
    Immutable,
    #[error("node lookup for key {key:?} fell through without resolving")]
    TraversalInvariant { key: String },
    #[error(transparent)]
    CharMap(#[from] CharMapError),
}

/// How bulk work on a trie is executed.
#[derive(Clone, Default)]
pub enum BuildPolicy {
    #[default]
    Sequential,
    /// Work is spread over the given pool.
    Parallel(Arc<ThreadPool>),
}

impl BuildPolicy {
    pub const fn is_parallel(&self) -> bool {
        matches!(self, Self::Parallel(_))
    }

    /// Runs `f` inside the pool if there is one, telling it whether to fan out.
    pub fn run<R: Send>(&self, f: impl FnOnce(bool) -> R + Send) -> R {
        match self {
            Self::Sequential => f(false),
            Self::Parallel(pool) => pool.install(|| f(true)),
        }
    }
}

impl fmt::Debug for BuildPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("Sequential"),
            Self::Parallel(pool) => write!(f, "Parallel({} threads)", pool.current_num_threads()),
        }
    }
}

/// Where a lookup for a key stopped.
struct NodeMatch<T> {
    node: LockedNode<Arc<Node<T>>, T>,
    /// The key ends exactly at the end of the node's label.
    exact: bool,
    index_in_node: usize,
    index_in_key: usize,
}

enum Advance<T> {
    /// The next key character continues the label.
    Label(usize),
    /// The label is exhausted and a transition continues the key.
    Child(Arc<Node<T>>, usize),
    /// Nothing continues the key here.
    Stop { exact: bool },
}

pub struct Trie<T> {
    root: Arc<Node<T>>,
    policy: BuildPolicy,
    compressed: bool,
}

impl<T: TrieValue> Default for Trie<T> {
    fn default() -> Self {
        Self::new(BuildPolicy::Sequential)
    }
}

impl<T: TrieValue> Trie<T> {
    pub fn new(policy: BuildPolicy) -> Self {
        Self {
            root: Arc::new(Node::new(Arc::from(""), ValueSet::Empty)),
            policy,
            compressed: false,
        }
    }

    pub const fn policy(&self) -> &BuildPolicy {
        &self.policy
    }

    pub const fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Adds `value` under `key`. Safe to call from many threads at once.
    pub fn insert(&self, key: &str, value: T) -> Result<(), TrieError> {
        if self.compressed {
            return Err(TrieError::Immutable);
        }
        let mut found = self.find_node(key, true)?;
        let (index_in_key, index_in_node) = (found.index_in_key, found.index_in_node);
        found
            .node
            .data_mut()
            .insert(key, index_in_key, index_in_node, value)
    }

    /// Values stored exactly under `key`, in ascending order.
    pub fn get(&self, key: &str) -> Result<Vec<T>, TrieError> {
        let found = self.find_node(key, false)?;
        if found.exact {
            Ok(found.node.values.to_sorted().to_vec())
        } else {
            Ok(Vec::new())
        }
    }

    /// Walks every branch the matcher can still accept and merges the values
    /// of matching nodes by rank.
    pub fn search(&self, matcher: &CompiledRegex) -> RankedResults<T>
    where
        T: Ranked,
    {
        let mut found = Vec::new();
        collect_matches(&self.root, matcher, MatchState::START, &mut found);
        RankedResults::new(found)
    }

    /// Freezes the trie and shares its structure through `cache`. Irreversible.
    pub fn compress(&mut self, cache: &CompactionCache<T>) -> Result<(), TrieError> {
        if self.compressed {
            return Err(TrieError::Immutable);
        }
        let root = &self.root;
        let compressed = self.policy.run(|parallel| root.compress(cache, parallel))?;
        self.root = compressed;
        self.compressed = true;
        Ok(())
    }

    fn find_node(&self, key: &str, for_write: bool) -> Result<NodeMatch<T>, TrieError> {
        let mut node = LockedNode::read(Arc::clone(&self.root));
        let mut index_in_node = 0;
        let mut index_in_key = 0;
        let mut node_start_in_key = 0;

        while index_in_key <= key.len() {
            let label_len = node.label.len();
            match advance(&node, key, index_in_key, index_in_node) {
                Advance::Label(width) => {
                    index_in_node += width;
                    index_in_key += width;
                }
                Advance::Child(child, width) => {
                    // lock the child before the parent guard is dropped
                    node = LockedNode::read(child);
                    index_in_key += width;
                    node_start_in_key = index_in_key;
                    index_in_node = 0;
                }
                Advance::Stop { exact } => {
                    if !for_write || node.is_write() {
                        return Ok(NodeMatch {
                            node,
                            exact,
                            index_in_node,
                            index_in_key,
                        });
                    }
                    node.upgrade();
                    // Another writer may have split this node while it was
                    // unlocked; the label then ends before our position.
                    let new_len = node.label.len();
                    if new_len != label_len && new_len < index_in_node {
                        index_in_key = node_start_in_key + new_len;
                        index_in_node = new_len;
                    }
                }
            }
        }
        Err(TrieError::TraversalInvariant { key: key.to_owned() })
    }
}

fn advance<T>(
    data: &node::NodeData<T>,
    key: &str,
    index_in_key: usize,
    index_in_node: usize,
) -> Advance<T> {
    let Some(c) = key[index_in_key..].chars().next() else {
        return Advance::Stop {
            exact: index_in_node == data.label.len(),
        };
    };
    match data.label[index_in_node..].chars().next() {
        Some(expected) if expected == c => Advance::Label(c.len_utf8()),
        Some(_) => Advance::Stop { exact: false },
        None => match data.transitions.get(c) {
            Some(child) => Advance::Child(Arc::clone(child), c.len_utf8()),
            None => Advance::Stop { exact: false },
        },
    }
}

fn collect_matches<T: TrieValue>(
    node: &Node<T>,
    matcher: &CompiledRegex,
    state: MatchState,
    found: &mut Vec<GradedValueSet<T>>,
) {
    let data = LockedNode::read(node);
    let state = matcher.step_through(&data.label, state);
    if !state.is_ok() {
        return;
    }
    if matcher.is_match(state) && !data.values.is_empty() {
        found.push(GradedValueSet::new(data.values.to_sorted(), matcher.grade(state)));
    }
    data.transitions.step_all(matcher, state, |next, child| {
        collect_matches(child, matcher, next, found);
    });
}

impl<T: TrieValue> PartialEq for Trie<T> {
    fn eq(&self, other: &Self) -> bool {
        self.root.content_eq(&other.root)
    }
}

impl<T: TrieValue> Eq for Trie<T> {}

impl<T: TrieValue> Hash for Trie<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.root.content_hash());
    }
}

impl<T> fmt::Debug for Trie<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trie")
            .field("policy", &self.policy)
            .field("compressed", &self.compressed)
            .field("frozen_root", &self.root.is_frozen())
            .finish_non_exhaustive()
    }
}
