//! Configuration file handling.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "javadoc-search.toml";

const LIBRARY_ID_PATTERN: &str = r"^[A-Za-z0-9_-]{2,50}$";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{name} must be greater than zero")]
    NotPositive { name: &'static str },
    #[error("suggestion_count {count} exceeds suggestion_count_limit {limit}")]
    CountAboveLimit { count: usize, limit: usize },
    #[error("invalid library id '{0}', expected 2 to 50 letters, digits, '_' or '-'")]
    LibraryId(String),
    #[error("library '{id}' has a blank {field}")]
    BlankField { id: String, field: &'static str },
    #[error("library '{id}' has base URL {url} which cannot resolve relative URLs")]
    BaseUrl { id: String, url: Url },
    #[error("expected exactly one default library, found {0}")]
    DefaultLibraries(usize),
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Limits applied to incoming searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Longest accepted query, in characters.
    pub query_char_limit: usize,
    /// Largest number of suggestions one request may ask for.
    pub suggestion_count_limit: usize,
    /// Number of suggestions when the request does not say.
    pub suggestion_count: usize,
    /// Searches taking at least this long are logged.
    pub log_search_threshold_nanos: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            query_char_limit: 1000,
            suggestion_count_limit: 50,
            suggestion_count: 10,
            log_search_threshold_nanos: 20_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build tries with a worker pool.
    pub concurrent: bool,
    /// Worker count; 0 lets rayon decide.
    pub threads: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            concurrent: true,
            threads: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub name: String,
    pub description: String,
    pub base_url: Url,
    /// Index file, relative to the configuration file.
    pub index: PathBuf,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub server: ServerConfig,
    pub build: BuildConfig,
    pub libraries: BTreeMap<String, LibraryConfig>,
}

impl Configuration {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(
            "Loaded configuration from {} with {} libraries",
            path.display(),
            config.libraries.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let server = &self.server;
        for (name, value) in [
            ("query_char_limit", server.query_char_limit),
            ("suggestion_count_limit", server.suggestion_count_limit),
            ("suggestion_count", server.suggestion_count),
        ] {
            if value == 0 {
                return Err(ConfigError::NotPositive { name });
            }
        }
        if server.suggestion_count > server.suggestion_count_limit {
            return Err(ConfigError::CountAboveLimit {
                count: server.suggestion_count,
                limit: server.suggestion_count_limit,
            });
        }

        let id_pattern = Regex::new(LIBRARY_ID_PATTERN)?;
        for (id, library) in &self.libraries {
            if !id_pattern.is_match(id) {
                return Err(ConfigError::LibraryId(id.clone()));
            }
            for (field, value) in [("name", &library.name), ("description", &library.description)] {
                if value.trim().is_empty() {
                    return Err(ConfigError::BlankField {
                        id: id.clone(),
                        field,
                    });
                }
            }
            if library.base_url.cannot_be_a_base() {
                return Err(ConfigError::BaseUrl {
                    id: id.clone(),
                    url: library.base_url.clone(),
                });
            }
        }

        let defaults = self.libraries.values().filter(|library| library.default).count();
        if defaults != 1 {
            return Err(ConfigError::DefaultLibraries(defaults));
        }
        Ok(())
    }

    /// Id of the library marked as default.
    pub fn default_library(&self) -> Option<&str> {
        self.libraries
            .iter()
            .find(|(_, library)| library.default)
            .map(|(id, _)| id.as_str())
    }
}
