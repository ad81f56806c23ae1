//! Error handling types and utilities.

use thiserror::Error;

use crate::config::ConfigError;
use crate::entity::IndexError;
use crate::regex::UnsupportedPattern;
use crate::search::{QueryError, ValidationError};
use crate::trie::TrieError;

/// A specialized Result type for application code.
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods where files are loaded and services are set up.
pub type Result<T> = anyhow::Result<T>;

/// Any failure of the search engine and the services around it.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Trie(#[from] TrieError),
    #[error(transparent)]
    Query(#[from] QueryError),
    /// The query compiler produced a pattern the matcher cannot run.
    #[error(transparent)]
    UnsupportedPattern(#[from] UnsupportedPattern),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to resolve result URL: {0}")]
    Url(#[from] url::ParseError),
}
