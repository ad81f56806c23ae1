//! Shared fixtures for integration tests.
//!
//! The fixture index is a small slice of the JDK API: enough overlapping names
//! (`IndexOutOfBoundsException` and its subclasses, `Math` and `StrictMath`,
//! `Collector` and `Collectors`) to exercise ranking and the case fallback.
//! A second module, `java.desktop`, holds a single type.
//!
//! # Available Fixtures
//!
//! - `jdk_index`: the resolved [`JavadocIndex`]
//! - `engine`: a search engine over it, built sequentially
//! - `service`: a [`SearchService`] with the index as its only library
//! - `library_dir`: a temp directory holding `jdk.json` and a config file

use javadoc_search::config::ServerConfig;
use javadoc_search::entity::IndexFile;
use javadoc_search::search::{EngineBuilder, RankedTrieSearchEngine, SearchService};
use javadoc_search::{JavadocIndex, SearchableEntity};
use rstest::fixture;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use url::Url;

pub const BASE_URL: &str = "https://docs.oracle.com/en/java/javase/21/docs/api/";

pub const JDK_INDEX_JSON: &str = r#"{
    "modules": [{"name": "java.base"}, {"name": "java.desktop"}],
    "packages": [
        {"module": "java.base", "name": "java.lang"},
        {"module": "java.base", "name": "java.util"},
        {"module": "java.base", "name": "java.util.stream"},
        {"module": "java.base", "name": "java.nio.file"},
        {"module": "java.base", "name": "java.util.concurrent.locks"},
        {"module": "java.desktop", "name": "javax.swing.text"}
    ],
    "types": [
        {"module": "java.base", "package": "java.lang", "name": "IndexOutOfBoundsException"},
        {"module": "java.base", "package": "java.lang", "name": "ArrayIndexOutOfBoundsException"},
        {"module": "java.base", "package": "java.lang", "name": "StringIndexOutOfBoundsException"},
        {"module": "java.base", "package": "java.lang", "name": "Math"},
        {"module": "java.base", "package": "java.lang", "name": "StrictMath"},
        {"module": "java.base", "package": "java.lang", "name": "Thread"},
        {"module": "java.base", "package": "java.util", "name": "AbstractSet"},
        {"module": "java.base", "package": "java.util", "name": "AbstractSequentialList"},
        {"module": "java.base", "package": "java.util", "name": "HashMap"},
        {"module": "java.base", "package": "java.util", "name": "Map"},
        {"module": "java.base", "package": "java.util", "name": "Map.Entry"},
        {"module": "java.base", "package": "java.util.stream", "name": "Collector"},
        {"module": "java.base", "package": "java.util.stream", "name": "Collector.Characteristics"},
        {"module": "java.base", "package": "java.util.stream", "name": "Collectors"},
        {"module": "java.base", "package": "java.nio.file", "name": "Files"},
        {"module": "java.base", "package": "java.nio.file", "name": "FileSystems"},
        {"module": "java.base", "package": "java.util.concurrent.locks", "name": "Condition"},
        {"module": "java.desktop", "package": "javax.swing.text", "name": "AttributeSet"}
    ],
    "members": [
        {"module": "java.base", "package": "java.lang", "type": "IndexOutOfBoundsException",
         "name": "IndexOutOfBoundsException()"},
        {"module": "java.base", "package": "java.lang", "type": "IndexOutOfBoundsException",
         "name": "IndexOutOfBoundsException(String)",
         "url": "%3Cinit%3E(java.lang.String)"},
        {"module": "java.base", "package": "java.lang", "type": "ArrayIndexOutOfBoundsException",
         "name": "ArrayIndexOutOfBoundsException(int)"},
        {"module": "java.base", "package": "java.lang", "type": "StringIndexOutOfBoundsException",
         "name": "StringIndexOutOfBoundsException(int)"},
        {"module": "java.base", "package": "java.lang", "type": "Math", "name": "max(int,int)"},
        {"module": "java.base", "package": "java.lang", "type": "Math", "name": "max(long,long)"},
        {"module": "java.base", "package": "java.lang", "type": "StrictMath", "name": "max(int,int)"},
        {"module": "java.base", "package": "java.lang", "type": "Thread", "name": "sleep(long)"},
        {"module": "java.base", "package": "java.util", "type": "AbstractSet", "name": "AbstractSet()"},
        {"module": "java.base", "package": "java.util", "type": "HashMap", "name": "HashMap()"},
        {"module": "java.base", "package": "java.util", "type": "Map.Entry", "name": "getKey()"},
        {"module": "java.base", "package": "java.util.stream", "type": "Collectors", "name": "toList()"},
        {"module": "java.base", "package": "java.nio.file", "type": "Files",
         "name": "copy(Path,Path,CopyOption...)",
         "url": "copy(java.nio.file.Path,java.nio.file.Path,java.nio.file.CopyOption...)"},
        {"module": "java.base", "package": "java.util.concurrent.locks", "type": "Condition",
         "name": "await()"}
    ],
    "tags": [
        {"name": "Serialized Form", "url": "serialized-form.html"},
        {"name": "Java Collections Framework", "holder": "package java.util",
         "description": "Collections overview", "url": "java.base/java/util/doc-files/coll-index.html"}
    ]
}"#;

#[fixture]
pub fn jdk_index() -> JavadocIndex {
    let file = IndexFile::from_json(JDK_INDEX_JSON).expect("fixture index should parse");
    file.into_index().expect("fixture index should resolve")
}

#[fixture]
pub fn engine(jdk_index: JavadocIndex) -> RankedTrieSearchEngine {
    RankedTrieSearchEngine::new(jdk_index).expect("engine should build")
}

#[fixture]
pub fn service(jdk_index: JavadocIndex) -> SearchService {
    let base_url = Url::parse(BASE_URL).expect("base url should parse");
    SearchService::single(
        ServerConfig::default(),
        "jdk",
        base_url,
        jdk_index,
        &EngineBuilder::default(),
    )
    .expect("service should build")
}

/// Qualified names of `entities`, in order.
#[allow(dead_code)] // Used across different integration test crates
pub fn qualified_names<'a>(entities: impl IntoIterator<Item = &'a SearchableEntity>) -> Vec<String> {
    entities
        .into_iter()
        .map(|entity| entity.qualified_name().to_owned())
        .collect()
}

/// A temporary directory that is removed when dropped.
#[allow(dead_code)] // Methods used across different integration test crates
pub struct TempWorkspace {
    _temp: TempDir,
    root: PathBuf,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl TempWorkspace {
    pub(crate) fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.root
    }

    /// Writes `content` to `path`, creating parent directories.
    ///
    /// # Panics
    /// Panics if the file cannot be written.
    pub(crate) fn create_file(&self, path: &str, content: &str) -> PathBuf {
        let full_path = self.root.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap_or_else(|e| {
                panic!("Failed to create parent directory for '{}': {}", path, e)
            });
        }
        std::fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("Failed to write file '{}': {}", path, e));
        full_path
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// A workspace with the fixture index at `indexes/jdk.json` and a config file
/// naming it as the default library.
#[fixture]
pub fn library_dir() -> (TempWorkspace, PathBuf) {
    let workspace = TempWorkspace::new();
    workspace.create_file("indexes/jdk.json", JDK_INDEX_JSON);
    let config = workspace.create_file(
        "javadoc-search.toml",
        &format!(
            r#"
[server]
suggestion_count = 3

[build]
concurrent = false

[libraries.jdk]
name = "Java SE 21"
description = "Java Platform, Standard Edition 21 API"
base_url = "{BASE_URL}"
index = "indexes/jdk.json"
default = true
"#
        ),
    );
    (workspace, config)
}
