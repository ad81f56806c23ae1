//! Named documentation libraries and the search service answering requests
//! against them.

use regex::Regex;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

use super::engine::{EngineBuilder, RankedTrieSearchEngine};
use crate::config::{ConfigError, Configuration, ServerConfig};
use crate::entity::{EntityKind, IndexFile, JavadocIndex, SearchableEntity};
use crate::error::EngineError;

/// Rejected request input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("query has {length} characters, at most {limit} are allowed")]
    QueryTooLong { length: usize, limit: usize },
    #[error("query contains the undefined character U+{:04X}", code_point(.0))]
    UndefinedCharacter(char),
    #[error("suggestion count must be between 1 and {limit}, got {count}")]
    SuggestionCount { count: usize, limit: usize },
    #[error("unknown library '{0}'")]
    UnknownLibrary(String),
    #[error("no libraries configured")]
    NoLibraries,
}

fn code_point(c: &char) -> u32 {
    u32::from(*c)
}

/// One searchable documentation set.
pub struct Library {
    id: String,
    name: String,
    description: String,
    base_url: Url,
    engine: RankedTrieSearchEngine,
}

impl Library {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        base_url: Url,
        engine: RankedTrieSearchEngine,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            base_url,
            engine,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub const fn engine(&self) -> &RankedTrieSearchEngine {
        &self.engine
    }

    /// Absolute URL of an entity of this library.
    pub fn entity_url(&self, entity: &SearchableEntity) -> Result<Url, url::ParseError> {
        self.base_url.join(entity.url())
    }
}

/// Checks request input against the configured limits.
pub struct QueryValidator {
    limits: ServerConfig,
    undefined: Regex,
}

impl QueryValidator {
    pub fn new(limits: ServerConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            limits,
            undefined: Regex::new(r"\p{Unassigned}")?,
        })
    }

    pub fn validate_query(&self, query: &str) -> Result<(), ValidationError> {
        let length = query.chars().count();
        if length > self.limits.query_char_limit {
            return Err(ValidationError::QueryTooLong {
                length,
                limit: self.limits.query_char_limit,
            });
        }
        if let Some(found) = self.undefined.find(query)
            && let Some(c) = found.as_str().chars().next()
        {
            return Err(ValidationError::UndefinedCharacter(c));
        }
        Ok(())
    }

    /// The number of suggestions to return; the configured default when the
    /// request does not ask for a count.
    pub fn suggestion_count(&self, requested: Option<usize>) -> Result<usize, ValidationError> {
        let limit = self.limits.suggestion_count_limit;
        match requested {
            None => Ok(self.limits.suggestion_count),
            Some(count) if count == 0 || count > limit => {
                Err(ValidationError::SuggestionCount { count, limit })
            }
            Some(count) => Ok(count),
        }
    }
}

/// Logs searches slower than the configured threshold.
fn report_search(limits: &ServerConfig, query: &str, operation: &str, elapsed: Duration) {
    if elapsed.as_nanos() >= u128::from(limits.log_search_threshold_nanos) {
        tracing::info!(
            "Search for '{}' took {:.1} ms. (operation: {})",
            query,
            elapsed.as_secs_f64() * 1000.0,
            operation
        );
    }
}

/// Search results of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityGroup {
    pub kind: EntityKind,
    pub entities: Vec<SearchableEntity>,
}

/// Validated, timed searches over a set of libraries.
pub struct SearchService {
    limits: ServerConfig,
    validator: QueryValidator,
    libraries: Vec<Library>,
    default_library: usize,
}

impl SearchService {
    /// `default_library` names one of `libraries`.
    pub fn new(
        limits: ServerConfig,
        libraries: Vec<Library>,
        default_library: &str,
    ) -> Result<Self, EngineError> {
        if libraries.is_empty() {
            return Err(ValidationError::NoLibraries.into());
        }
        let default_library = libraries
            .iter()
            .position(|library| library.id == default_library)
            .ok_or_else(|| ValidationError::UnknownLibrary(default_library.to_owned()))?;
        let validator = QueryValidator::new(limits.clone()).map_err(ConfigError::Pattern)?;
        Ok(Self {
            limits,
            validator,
            libraries,
            default_library,
        })
    }

    /// Loads every configured library. Index paths are resolved against
    /// `base_dir`.
    pub fn from_config(
        config: &Configuration,
        base_dir: &Path,
        builder: &EngineBuilder,
    ) -> Result<Self, EngineError> {
        let mut libraries = Vec::with_capacity(config.libraries.len());
        for (id, library) in &config.libraries {
            let index = IndexFile::load(&base_dir.join(&library.index))?;
            tracing::info!("Building search engine for library '{}'", id);
            libraries.push(Library::new(
                id,
                &library.name,
                &library.description,
                library.base_url.clone(),
                builder.build(index)?,
            ));
        }
        let default_library = config
            .default_library()
            .ok_or(ValidationError::NoLibraries)?;
        Self::new(config.server.clone(), libraries, default_library)
    }

    /// A service over a single, default library.
    pub fn single(
        limits: ServerConfig,
        id: &str,
        base_url: Url,
        index: JavadocIndex,
        builder: &EngineBuilder,
    ) -> Result<Self, EngineError> {
        let engine = builder.build(index)?;
        let library = Library::new(id, id, id, base_url, engine);
        Self::new(limits, vec![library], id)
    }

    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    pub fn default_library(&self) -> &Library {
        &self.libraries[self.default_library]
    }

    /// The library with `id`, or the default one.
    pub fn library(&self, id: Option<&str>) -> Result<&Library, ValidationError> {
        match id {
            None => Ok(self.default_library()),
            Some(id) => self
                .libraries
                .iter()
                .find(|library| library.id == id)
                .ok_or_else(|| ValidationError::UnknownLibrary(id.to_owned())),
        }
    }

    pub const fn validator(&self) -> &QueryValidator {
        &self.validator
    }

    /// The best `count` matches, after validating the request.
    pub fn search(
        &self,
        library: Option<&str>,
        query: &str,
        count: Option<usize>,
    ) -> Result<Vec<SearchableEntity>, EngineError> {
        let library = self.library(library)?;
        self.validator.validate_query(query)?;
        let count = self.validator.suggestion_count(count)?;

        let start = Instant::now();
        let results: Vec<_> = library.engine.search(query)?.take(count).collect();
        report_search(&self.limits, query, "search", start.elapsed());
        Ok(results)
    }

    /// The best `count` matches of every entity kind.
    pub fn search_grouped(
        &self,
        library: Option<&str>,
        query: &str,
        count: Option<usize>,
    ) -> Result<Vec<EntityGroup>, EngineError> {
        let library = self.library(library)?;
        self.validator.validate_query(query)?;
        let count = self.validator.suggestion_count(count)?;

        let start = Instant::now();
        let groups = library
            .engine
            .search_grouped(query)?
            .into_groups()
            .into_iter()
            .map(|(kind, results)| EntityGroup {
                kind,
                entities: results.take(count).collect(),
            })
            .collect();
        report_search(&self.limits, query, "search_grouped", start.elapsed());
        Ok(groups)
    }

    /// URL of the best match, or the library's base URL when nothing matches.
    pub fn best_url(&self, library: Option<&str>, query: &str) -> Result<Url, EngineError> {
        let library = self.library(library)?;
        self.validator.validate_query(query)?;

        let start = Instant::now();
        let best = library.engine.search(query)?.next();
        report_search(&self.limits, query, "best_url", start.elapsed());
        match best {
            Some(entity) => Ok(library.entity_url(&entity)?),
            None => Ok(library.base_url.clone()),
        }
    }
}
