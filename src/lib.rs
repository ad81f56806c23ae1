pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod regex;
pub mod search;
pub mod tracing;
pub mod trie;

pub use entity::{EntityKind, JavadocIndex, SearchableEntity};
pub use error::EngineError;
pub use search::{RankedTrieSearchEngine, SearchService, query_regex};
