//! Fuzzy search over documentation entities.
//!
//! Entities are stored in tries under their qualified name and every suffix
//! a user might start typing at; queries are compiled into possessive regexes
//! that steer a pruning walk over those tries.

pub(crate) mod engine;
pub(crate) mod generator;
pub(crate) mod keys;
pub(crate) mod library;
pub(crate) mod query;

pub use engine::{
    EngineBuilder, EntityResults, GroupedSearchResult, RankedEntry, RankedTrieSearchEngine,
    ranked_entries,
};
pub use generator::TrieGenerator;
pub use keys::{
    SEGMENT_DIVIDER, SEPARATORS, SKIP, is_separator, is_useful, join_segments, key_variants,
    trie_key,
};
pub use library::{EntityGroup, Library, QueryValidator, SearchService, ValidationError};
pub use query::{QueryError, query_regex};
