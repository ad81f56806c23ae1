//! JSON index files listing the entities of one documentation set.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::{JavadocIndex, SearchableEntity, UNNAMED_PACKAGE};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to read index file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed index: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown module '{0}'")]
    UnknownModule(String),
    #[error("unknown package '{name}' in module {module:?}")]
    UnknownPackage {
        module: Option<String>,
        name: String,
    },
    #[error("unknown type '{name}' in package '{package}'")]
    UnknownType { package: String, name: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Empty for the unnamed package.
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default)]
    pub package: String,
    pub name: String,
    /// Page URL relative to the documentation root when it is not derived
    /// from the package and name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default)]
    pub package: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    /// URL fragment when it differs from the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
}

/// On-disk form of a [`JavadocIndex`]. Nested entities name their containers,
/// which must be listed as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexFile {
    pub modules: Vec<ModuleRecord>,
    pub packages: Vec<PackageRecord>,
    pub types: Vec<TypeRecord>,
    pub members: Vec<MemberRecord>,
    pub tags: Vec<TagRecord>,
}

type PackageKey<'a> = (Option<&'a str>, &'a str);
type TypeKey<'a> = (Option<&'a str>, &'a str, &'a str);

fn package_name(name: &str) -> &str {
    if name.is_empty() { UNNAMED_PACKAGE } else { name }
}

impl IndexFile {
    pub fn from_json(json: &str) -> Result<Self, IndexError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and resolves the index file at `path`.
    pub fn load(path: &Path) -> Result<JavadocIndex, IndexError> {
        let json = std::fs::read_to_string(path).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::from_json(&json)?.into_index()?;
        tracing::debug!(
            "Loaded {} entities from {}",
            index.len(),
            path.display()
        );
        Ok(index)
    }

    /// Builds the entities, resolving containers by name.
    pub fn into_index(self) -> Result<JavadocIndex, IndexError> {
        let mut modules = AHashMap::new();
        for record in &self.modules {
            modules.insert(record.name.as_str(), SearchableEntity::module(&record.name));
        }

        let mut packages: AHashMap<PackageKey<'_>, SearchableEntity> = AHashMap::new();
        for record in &self.packages {
            let module = resolve_module(&modules, record.module.as_deref())?;
            let package = SearchableEntity::package(module, &record.name);
            packages.insert(
                (record.module.as_deref(), package_name(&record.name)),
                package,
            );
        }

        let mut types: AHashMap<TypeKey<'_>, SearchableEntity> = AHashMap::new();
        for record in &self.types {
            let package = resolve_package(&packages, record.module.as_deref(), &record.package)?;
            types.insert(
                (
                    record.module.as_deref(),
                    package_name(&record.package),
                    record.name.as_str(),
                ),
                SearchableEntity::type_(package, &record.name, record.url.as_deref()),
            );
        }

        let mut members = Vec::with_capacity(self.members.len());
        for record in &self.members {
            let key = (
                record.module.as_deref(),
                package_name(&record.package),
                record.type_name.as_str(),
            );
            let type_ = types.get(&key).ok_or_else(|| IndexError::UnknownType {
                package: package_name(&record.package).to_owned(),
                name: record.type_name.clone(),
            })?;
            members.push(SearchableEntity::member(
                type_,
                &record.name,
                record.url.as_deref(),
            ));
        }

        let tags = self
            .tags
            .iter()
            .map(|record| {
                SearchableEntity::tag(
                    record.holder.as_deref(),
                    &record.name,
                    record.description.as_deref(),
                    &record.url,
                )
            })
            .collect();

        // entities keep the order of the file
        Ok(JavadocIndex {
            modules: self
                .modules
                .iter()
                .filter_map(|record| modules.get(record.name.as_str()).cloned())
                .collect(),
            packages: self
                .packages
                .iter()
                .filter_map(|record| {
                    packages
                        .get(&(record.module.as_deref(), package_name(&record.name)))
                        .cloned()
                })
                .collect(),
            types: self
                .types
                .iter()
                .filter_map(|record| {
                    types
                        .get(&(
                            record.module.as_deref(),
                            package_name(&record.package),
                            record.name.as_str(),
                        ))
                        .cloned()
                })
                .collect(),
            members,
            tags,
        })
    }
}

fn resolve_module<'m>(
    modules: &'m AHashMap<&str, SearchableEntity>,
    name: Option<&str>,
) -> Result<Option<&'m SearchableEntity>, IndexError> {
    name.map(|name| {
        modules
            .get(name)
            .ok_or_else(|| IndexError::UnknownModule(name.to_owned()))
    })
    .transpose()
}

fn resolve_package<'p, 'k>(
    packages: &'p AHashMap<PackageKey<'k>, SearchableEntity>,
    module: Option<&'k str>,
    name: &'k str,
) -> Result<&'p SearchableEntity, IndexError> {
    packages
        .get(&(module, package_name(name)))
        .ok_or_else(|| IndexError::UnknownPackage {
            module: module.map(str::to_owned),
            name: package_name(name).to_owned(),
        })
}
