//! Ranked fuzzy search over a whole documentation index.

use ahash::AHashSet;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::time::Instant;

use super::generator::TrieGenerator;
use super::keys::{key_variants, trie_key};
use super::query::query_regex;
use crate::entity::{EntityKind, JavadocIndex, SearchableEntity};
use crate::error::EngineError;
use crate::regex::{CompiledRegex, Regex};
use crate::trie::{BuildPolicy, CacheStats, Ranked, RankedResults, Trie, TrieError};

/// An entity stored under one of its keys, with that key's weight.
///
/// Sorts by descending weight first, so the values of a trie node come out
/// best-first.
#[derive(Debug, Clone)]
pub struct RankedEntry {
    entity: SearchableEntity,
    weight: f64,
}

impl RankedEntry {
    pub const fn new(entity: SearchableEntity, weight: f64) -> Self {
        Self { entity, weight }
    }

    pub const fn entity(&self) -> &SearchableEntity {
        &self.entity
    }

    pub fn into_entity(self) -> SearchableEntity {
        self.entity
    }
}

impl Ranked for RankedEntry {
    fn weight(&self) -> f64 {
        self.weight
    }
}

impl Ord for RankedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .total_cmp(&self.weight)
            .then_with(|| self.entity.cmp(&other.entity))
    }
}

impl PartialOrd for RankedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedEntry {}

impl Hash for RankedEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity.hash(state);
        self.weight.to_bits().hash(state);
    }
}

/// Every key of `entity` paired with its weight.
pub fn ranked_entries(entity: &SearchableEntity) -> Vec<(String, RankedEntry)> {
    let key = trie_key(entity);
    key_variants(&key)
        .into_iter()
        .map(|(variant, weight)| {
            (
                variant.to_owned(),
                RankedEntry::new(entity.clone(), weight),
            )
        })
        .collect()
}

/// Lazy, rank-ordered search hits with every entity reported once.
pub struct EntityResults {
    ranked: RankedResults<RankedEntry>,
    seen: AHashSet<SearchableEntity>,
    peeked: Option<(SearchableEntity, f64)>,
}

impl EntityResults {
    fn new(ranked: RankedResults<RankedEntry>) -> Self {
        Self {
            ranked,
            seen: AHashSet::new(),
            peeked: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(RankedResults::empty())
    }

    /// The next entity and the rank of its best match.
    pub fn next_ranked(&mut self) -> Option<(SearchableEntity, f64)> {
        if let Some(peeked) = self.peeked.take() {
            return Some(peeked);
        }
        loop {
            let (entry, rank) = self.ranked.next_ranked()?;
            let entity = entry.into_entity();
            if self.seen.insert(entity.clone()) {
                return Some((entity, rank));
            }
        }
    }

    /// Whether no hit is left, fetching the next one ahead if needed.
    pub fn is_exhausted(&mut self) -> bool {
        if self.peeked.is_none() {
            self.peeked = self.next_ranked();
        }
        self.peeked.is_none()
    }
}

impl Iterator for EntityResults {
    type Item = SearchableEntity;

    fn next(&mut self) -> Option<SearchableEntity> {
        self.next_ranked().map(|(entity, _)| entity)
    }
}

/// Results of one query, split by entity kind.
pub struct GroupedSearchResult {
    pub modules: EntityResults,
    pub packages: EntityResults,
    pub types: EntityResults,
    pub members: EntityResults,
    pub tags: EntityResults,
}

impl GroupedSearchResult {
    pub fn empty() -> Self {
        Self {
            modules: EntityResults::empty(),
            packages: EntityResults::empty(),
            types: EntityResults::empty(),
            members: EntityResults::empty(),
            tags: EntityResults::empty(),
        }
    }

    pub fn group(&mut self, kind: EntityKind) -> &mut EntityResults {
        match kind {
            EntityKind::Module => &mut self.modules,
            EntityKind::Package => &mut self.packages,
            EntityKind::Type => &mut self.types,
            EntityKind::Member => &mut self.members,
            EntityKind::Tag => &mut self.tags,
        }
    }

    pub fn is_exhausted(&mut self) -> bool {
        EntityKind::ALL
            .into_iter()
            .all(|kind| self.group(kind).is_exhausted())
    }

    pub fn into_groups(self) -> [(EntityKind, EntityResults); 5] {
        [
            (EntityKind::Module, self.modules),
            (EntityKind::Package, self.packages),
            (EntityKind::Type, self.types),
            (EntityKind::Member, self.members),
            (EntityKind::Tag, self.tags),
        ]
    }
}

/// Builds a [`RankedTrieSearchEngine`] with a given build policy.
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    policy: BuildPolicy,
}

impl EngineBuilder {
    pub fn new(policy: BuildPolicy) -> Self {
        Self { policy }
    }

    /// Builds the combined trie and one trie per entity kind, all compressed
    /// against one cache.
    pub fn build(&self, index: JavadocIndex) -> Result<RankedTrieSearchEngine, TrieError> {
        let start = Instant::now();
        let generator = TrieGenerator::new(self.policy.clone());

        let everything: Vec<SearchableEntity> = index.iter().cloned().collect();
        let all = generator.build_from("all", &everything, ranked_entries)?;
        let build = |kind: EntityKind| {
            generator.build_from(kind.as_str(), index.of_kind(kind), ranked_entries)
        };
        let modules = build(EntityKind::Module)?;
        let packages = build(EntityKind::Package)?;
        let types = build(EntityKind::Type)?;
        let members = build(EntityKind::Member)?;
        let tags = build(EntityKind::Tag)?;

        let cache_stats = generator.cache_stats();
        tracing::info!(
            "Search engine ready: {} entities, {} shared nodes in {:?}",
            index.len(),
            cache_stats.nodes,
            start.elapsed()
        );
        Ok(RankedTrieSearchEngine {
            index,
            all,
            modules,
            packages,
            types,
            members,
            tags,
            cache_stats,
        })
    }
}

/// Fuzzy search engine over one [`JavadocIndex`].
///
/// Queries are first matched case-sensitively; when that finds nothing at all
/// they are retried ignoring case.
pub struct RankedTrieSearchEngine {
    index: JavadocIndex,
    all: Trie<RankedEntry>,
    modules: Trie<RankedEntry>,
    packages: Trie<RankedEntry>,
    types: Trie<RankedEntry>,
    members: Trie<RankedEntry>,
    tags: Trie<RankedEntry>,
    cache_stats: CacheStats,
}

impl RankedTrieSearchEngine {
    pub fn new(index: JavadocIndex) -> Result<Self, TrieError> {
        EngineBuilder::default().build(index)
    }

    pub const fn index(&self) -> &JavadocIndex {
        &self.index
    }

    pub const fn cache_stats(&self) -> CacheStats {
        self.cache_stats
    }

    fn trie(&self, kind: EntityKind) -> &Trie<RankedEntry> {
        match kind {
            EntityKind::Module => &self.modules,
            EntityKind::Package => &self.packages,
            EntityKind::Type => &self.types,
            EntityKind::Member => &self.members,
            EntityKind::Tag => &self.tags,
        }
    }

    /// All entities matching `query`, best first.
    pub fn search(&self, query: &str) -> Result<EntityResults, EngineError> {
        let regex = query_regex(query)?;
        let mut results = self.search_regex(&regex, false)?;
        if results.is_exhausted() {
            tracing::debug!("No case-sensitive match for '{}', ignoring case", query);
            results = self.search_regex(&regex, true)?;
        }
        Ok(results)
    }

    pub fn search_regex(
        &self,
        regex: &Regex,
        case_insensitive: bool,
    ) -> Result<EntityResults, EngineError> {
        let matcher = CompiledRegex::new(regex, case_insensitive)?;
        Ok(EntityResults::new(self.all.search(&matcher)))
    }

    /// Matching entities per kind. Falls back to ignoring case only when no
    /// group has a hit.
    pub fn search_grouped(&self, query: &str) -> Result<GroupedSearchResult, EngineError> {
        let regex = query_regex(query)?;
        let mut grouped = self.search_grouped_regex(&regex, false)?;
        if grouped.is_exhausted() {
            tracing::debug!("No case-sensitive match for '{}' in any group, ignoring case", query);
            grouped = self.search_grouped_regex(&regex, true)?;
        }
        Ok(grouped)
    }

    pub fn search_grouped_regex(
        &self,
        regex: &Regex,
        case_insensitive: bool,
    ) -> Result<GroupedSearchResult, EngineError> {
        let matcher = CompiledRegex::new(regex, case_insensitive)?;
        let mut grouped = GroupedSearchResult::empty();
        for kind in EntityKind::ALL {
            *grouped.group(kind) = EntityResults::new(self.trie(kind).search(&matcher));
        }
        Ok(grouped)
    }
}
