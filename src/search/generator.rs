//! Bulk construction of compressed tries.

use rayon::prelude::*;
use std::time::Instant;

use crate::trie::{BuildPolicy, CacheStats, CompactionCache, Trie, TrieError, TrieValue};

/// Builds tries from keyed entries and compresses them against one shared
/// cache, so tries built from overlapping data share their structure.
pub struct TrieGenerator<T> {
    policy: BuildPolicy,
    cache: CompactionCache<T>,
}

impl<T: TrieValue> TrieGenerator<T> {
    pub fn new(policy: BuildPolicy) -> Self {
        Self {
            policy,
            cache: CompactionCache::new(),
        }
    }

    pub const fn policy(&self) -> &BuildPolicy {
        &self.policy
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Builds a compressed trie from `(key, value)` pairs.
    pub fn build(&self, entries: Vec<(String, T)>) -> Result<Trie<T>, TrieError> {
        self.build_from("entries", &entries, |(key, value)| {
            vec![(key.clone(), value.clone())]
        })
    }

    /// Builds a compressed trie, expanding every source into its keyed
    /// entries. With a parallel policy, sources are inserted concurrently.
    pub fn build_from<S, F>(&self, name: &str, sources: &[S], expand: F) -> Result<Trie<T>, TrieError>
    where
        S: Sync,
        F: Fn(&S) -> Vec<(String, T)> + Sync,
    {
        let mut trie = Trie::new(self.policy.clone());
        let start = Instant::now();
        self.policy.run(|parallel| {
            let insert_all = |source: &S| -> Result<(), TrieError> {
                expand(source)
                    .into_iter()
                    .try_for_each(|(key, value)| trie.insert(&key, value))
            };
            if parallel {
                sources.par_iter().try_for_each(insert_all)
            } else {
                sources.iter().try_for_each(insert_all)
            }
        })?;
        let inserted = start.elapsed();

        trie.compress(&self.cache)?;
        tracing::debug!(
            "Built {} trie from {} sources in {:?}, compressed in {:?} (parallel: {})",
            name,
            sources.len(),
            inserted,
            start.elapsed() - inserted,
            self.policy.is_parallel()
        );
        Ok(trie)
    }
}
