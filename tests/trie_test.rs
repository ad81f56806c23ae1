use assert2::{check, let_assert};
use javadoc_search::search::TrieGenerator;
use javadoc_search::trie::{BuildPolicy, CompactionCache, Trie};
use proptest::prelude::*;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

fn hash_of(trie: &Trie<u32>) -> u64 {
    let mut hasher = DefaultHasher::new();
    trie.hash(&mut hasher);
    hasher.finish()
}

fn parallel_policy(threads: usize) -> BuildPolicy {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .expect("pool should start");
    BuildPolicy::Parallel(Arc::new(pool))
}

/// Keys sharing long prefixes so concurrent writers keep splitting the same
/// nodes.
fn contended_keys() -> Vec<(String, u32)> {
    let mut keys = Vec::new();
    for package in ["java.util", "java.util.concurrent", "java.util.function"] {
        for name in ["Map", "HashMap", "Maps", "ConcurrentHashMap", "M", "Ma"] {
            for id in 0..4 {
                keys.push((format!("{package}.{name}"), id));
            }
        }
    }
    keys
}

#[test]
fn concurrent_inserts_match_sequential_inserts() {
    let keys = contended_keys();

    let sequential = Trie::new(BuildPolicy::Sequential);
    for (key, id) in &keys {
        let_assert!(Ok(()) = sequential.insert(key, *id));
    }

    for round in 0..8 {
        let concurrent = Trie::new(BuildPolicy::Sequential);
        let policy = parallel_policy(8);
        let_assert!(
            Ok(()) = policy.run(|_| {
                keys.par_iter()
                    .try_for_each(|(key, id)| concurrent.insert(key, *id))
            })
        );
        check!(concurrent == sequential, "round {round}");
        check!(hash_of(&concurrent) == hash_of(&sequential), "round {round}");
    }
}

#[test]
fn compressed_tries_keep_equality_and_hash() {
    let keys = contended_keys();
    let sequential = TrieGenerator::new(BuildPolicy::Sequential);
    let parallel = TrieGenerator::new(parallel_policy(4));
    let_assert!(Ok(a) = sequential.build(keys.clone()));
    let_assert!(Ok(b) = parallel.build(keys));
    check!(a.is_compressed());
    check!(a == b);
    check!(hash_of(&a) == hash_of(&b));
}

#[test]
fn compression_shares_identical_tries() {
    let cache = CompactionCache::new();
    let mut first = Trie::new(BuildPolicy::Sequential);
    let mut second = Trie::new(BuildPolicy::Sequential);
    for trie in [&first, &second] {
        let_assert!(Ok(()) = trie.insert("Exception", 1));
        let_assert!(Ok(()) = trie.insert("Error", 2));
    }
    let_assert!(Ok(()) = first.compress(&cache));
    let stats = cache.stats();
    let_assert!(Ok(()) = second.compress(&cache));
    check!(cache.stats() == stats);
    check!(first == second);
}

proptest! {
    #[test]
    fn every_inserted_key_is_found(
        entries in prop::collection::vec(("[ab.]{1,6}", 0u32..4), 1..40),
        probe in "[ab.]{0,7}",
    ) {
        let mut expected: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        for (key, id) in &entries {
            expected.entry(key.clone()).or_default().push(*id);
        }
        for ids in expected.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }

        let generator = TrieGenerator::new(BuildPolicy::Sequential);
        let trie = generator.build(entries).expect("build should succeed");
        for (key, ids) in &expected {
            prop_assert_eq!(&trie.get(key).expect("lookup should succeed"), ids);
        }
        let found = trie.get(&probe).expect("lookup should succeed");
        let empty = Vec::new();
        prop_assert_eq!(&found, expected.get(&probe).unwrap_or(&empty));
    }

    #[test]
    fn insertion_order_does_not_change_the_trie(
        keys in prop::collection::vec("[a-c]{1,5}", 1..30),
    ) {
        let forward = Trie::new(BuildPolicy::Sequential);
        let backward = Trie::new(BuildPolicy::Sequential);
        for (id, key) in keys.iter().enumerate() {
            forward.insert(key, id as u32).expect("insert should succeed");
        }
        for (id, key) in keys.iter().enumerate().rev() {
            backward.insert(key, id as u32).expect("insert should succeed");
        }
        prop_assert!(forward == backward);
        prop_assert_eq!(hash_of(&forward), hash_of(&backward));
    }
}
