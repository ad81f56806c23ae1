//! Documented API entities and their URLs.

mod index_file;

pub use index_file::{IndexError, IndexFile};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Name of the package without a name.
pub const UNNAMED_PACKAGE: &str = "<Unnamed>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Module,
    Package,
    Type,
    Member,
    Tag,
}

impl EntityKind {
    pub const ALL: [Self; 5] = [
        Self::Module,
        Self::Package,
        Self::Type,
        Self::Member,
        Self::Tag,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Package => "package",
            Self::Type => "type",
            Self::Member => "member",
            Self::Tag => "tag",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct EntityData {
    kind: EntityKind,
    name: String,
    segments: Vec<String>,
    qualified_name: String,
    url: String,
    /// What nested entities build their URL from.
    url_prefix: String,
    holder: Option<String>,
    description: Option<String>,
}

/// A searchable documentation entity. Cheap to clone.
///
/// Entities are ordered by name ignoring case, then by qualified name, then
/// by URL. Search results rely on this order to break rank ties.
#[derive(Clone)]
pub struct SearchableEntity(Arc<EntityData>);

fn concat_url(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

impl SearchableEntity {
    fn new(
        kind: EntityKind,
        name: &str,
        segments: Vec<String>,
        url: String,
        url_prefix: String,
    ) -> Self {
        Self(Arc::new(EntityData {
            kind,
            name: name.to_owned(),
            qualified_name: segments.concat(),
            segments,
            url,
            url_prefix,
            holder: None,
            description: None,
        }))
    }

    pub fn module(name: &str) -> Self {
        Self::new(
            EntityKind::Module,
            name,
            vec![name.to_owned()],
            concat_url(&[name, "module-summary.html"]),
            name.to_owned(),
        )
    }

    /// A package, optionally inside a module. An empty name or
    /// [`UNNAMED_PACKAGE`] denotes the unnamed package.
    pub fn package(module: Option<&Self>, name: &str) -> Self {
        let unnamed = name.is_empty() || name == UNNAMED_PACKAGE;
        let name = if unnamed { UNNAMED_PACKAGE } else { name };
        let module_prefix = module.map_or("", |module| module.0.url_prefix.as_str());
        let path = if unnamed { String::new() } else { name.replace('.', "/") };
        let url_prefix = concat_url(&[module_prefix, path.as_str()]);
        let url = concat_url(&[
            url_prefix.as_str(),
            if unnamed { UNNAMED_PACKAGE } else { "" },
            "package-summary.html",
        ]);
        Self::new(
            EntityKind::Package,
            name,
            nested_segments(module, "/", [name]),
            url,
            url_prefix,
        )
    }

    /// A type; nested type names like `Map.Entry` keep each `.` as its own
    /// segment. `url` replaces the page URL of the type, relative to the
    /// documentation root. Member URLs still start from the derived page.
    pub fn type_(package: &Self, name: &str, url: Option<&str>) -> Self {
        let file = format!("{name}.html");
        let url_prefix = concat_url(&[package.0.url_prefix.as_str(), file.as_str()]);
        let mut name_segments = Vec::new();
        for (index, part) in name.split('.').enumerate() {
            if index > 0 {
                name_segments.push(".");
            }
            name_segments.push(part);
        }
        Self::new(
            EntityKind::Type,
            name,
            nested_segments(Some(package), ".", name_segments),
            url.map_or_else(|| url_prefix.clone(), str::to_owned),
            url_prefix,
        )
    }

    /// A member of a type. `url_name` overrides the URL fragment, which
    /// differs from the name for overloads with generic parameters.
    pub fn member(type_: &Self, name: &str, url_name: Option<&str>) -> Self {
        let url = format!("{}#{}", type_.0.url_prefix, url_name.unwrap_or(name));
        Self::new(
            EntityKind::Member,
            name,
            nested_segments(Some(type_), ".", [name]),
            url.clone(),
            url,
        )
    }

    /// A search tag; `url` is relative to the documentation root.
    pub fn tag(holder: Option<&str>, name: &str, description: Option<&str>, url: &str) -> Self {
        Self(Arc::new(EntityData {
            kind: EntityKind::Tag,
            name: name.to_owned(),
            segments: vec![name.to_owned()],
            qualified_name: name.to_owned(),
            url: url.to_owned(),
            url_prefix: url.to_owned(),
            holder: holder.map(str::to_owned),
            description: description.map(str::to_owned),
        }))
    }

    pub fn kind(&self) -> EntityKind {
        self.0.kind
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The parts the qualified name is made of, separators included.
    pub fn segments(&self) -> &[String] {
        &self.0.segments
    }

    pub fn qualified_name(&self) -> &str {
        &self.0.qualified_name
    }

    /// URL relative to the documentation root.
    pub fn url(&self) -> &str {
        &self.0.url
    }

    pub fn holder(&self) -> Option<&str> {
        self.0.holder.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }
}

fn nested_segments<'a>(
    container: Option<&SearchableEntity>,
    separator: &str,
    own: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let mut segments = match container {
        Some(container) => {
            let mut segments = container.segments().to_vec();
            segments.push(separator.to_owned());
            segments
        }
        None => Vec::new(),
    };
    segments.extend(own.into_iter().map(str::to_owned));
    segments
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

impl Ord for SearchableEntity {
    fn cmp(&self, other: &Self) -> Ordering {
        if Arc::ptr_eq(&self.0, &other.0) {
            return Ordering::Equal;
        }
        cmp_ignore_case(self.name(), other.name())
            .then_with(|| self.qualified_name().cmp(other.qualified_name()))
            .then_with(|| self.url().cmp(other.url()))
    }
}

impl PartialOrd for SearchableEntity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SearchableEntity {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchableEntity {}

impl Hash for SearchableEntity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.qualified_name().hash(state);
        self.url().hash(state);
    }
}

impl fmt::Debug for SearchableEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.qualified_name())
    }
}

impl fmt::Display for SearchableEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.qualified_name())
    }
}

/// Every entity of one documentation set, grouped by kind.
#[derive(Debug, Clone, Default)]
pub struct JavadocIndex {
    pub modules: Vec<SearchableEntity>,
    pub packages: Vec<SearchableEntity>,
    pub types: Vec<SearchableEntity>,
    pub members: Vec<SearchableEntity>,
    pub tags: Vec<SearchableEntity>,
}

impl JavadocIndex {
    pub fn of_kind(&self, kind: EntityKind) -> &[SearchableEntity] {
        match kind {
            EntityKind::Module => &self.modules,
            EntityKind::Package => &self.packages,
            EntityKind::Type => &self.types,
            EntityKind::Member => &self.members,
            EntityKind::Tag => &self.tags,
        }
    }

    pub fn len(&self) -> usize {
        EntityKind::ALL.iter().map(|&kind| self.of_kind(kind).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchableEntity> {
        EntityKind::ALL
            .into_iter()
            .flat_map(|kind| self.of_kind(kind).iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    fn java_util() -> SearchableEntity {
        SearchableEntity::package(Some(&SearchableEntity::module("java.base")), "java.util")
    }

    #[test]
    fn test_module() {
        let module = SearchableEntity::module("java.base");
        check!(module.qualified_name() == "java.base");
        check!(module.url() == "java.base/module-summary.html");
    }

    #[test]
    fn test_package() {
        let package = java_util();
        check!(package.segments() == ["java.base", "/", "java.util"]);
        check!(package.qualified_name() == "java.base/java.util");
        check!(package.url() == "java.base/java/util/package-summary.html");
    }

    #[rstest]
    #[case(None, "<Unnamed>/package-summary.html")]
    #[case(Some("app"), "app/<Unnamed>/package-summary.html")]
    fn test_unnamed_package(#[case] module: Option<&str>, #[case] url: &str) {
        let module = module.map(SearchableEntity::module);
        let package = SearchableEntity::package(module.as_ref(), "");
        check!(package.name() == UNNAMED_PACKAGE);
        check!(package.url() == url);

        let type_ = SearchableEntity::type_(&package, "Main", None);
        check!(type_.url() == concat_url(&[module.as_ref().map_or("", |m| m.name()), "Main.html"]));
    }

    #[test]
    fn test_nested_type_segments() {
        let entry = SearchableEntity::type_(&java_util(), "Map.Entry", None);
        check!(entry.segments() == ["java.base", "/", "java.util", ".", "Map", ".", "Entry"]);
        check!(entry.qualified_name() == "java.base/java.util.Map.Entry");
        check!(entry.url() == "java.base/java/util/Map.Entry.html");
    }

    #[test]
    fn test_type_url_override() {
        let entry = SearchableEntity::type_(&java_util(), "Map.Entry", Some("java.base/java/util/Map_Entry.html"));
        check!(entry.url() == "java.base/java/util/Map_Entry.html");
        check!(entry.qualified_name() == "java.base/java.util.Map.Entry");

        let key = SearchableEntity::member(&entry, "getKey()", None);
        check!(key.url() == "java.base/java/util/Map.Entry.html#getKey()");
    }

    #[rstest]
    #[case("add(E)", None, "java.base/java/util/List.html#add(E)")]
    #[case("toArray(T[])", Some("toArray(T[])-generic"), "java.base/java/util/List.html#toArray(T[])-generic")]
    fn test_member_url(#[case] name: &str, #[case] url_name: Option<&str>, #[case] url: &str) {
        let list = SearchableEntity::type_(&java_util(), "List", None);
        let member = SearchableEntity::member(&list, name, url_name);
        check!(member.url() == url);
        check!(member.qualified_name() == format!("java.base/java.util.List.{name}"));
    }

    #[test]
    fn test_tag() {
        let tag = SearchableEntity::tag(
            Some("java.lang.Object"),
            "Java Language Specification",
            Some("chapter"),
            "java.base/java/lang/Object.html#jls",
        );
        check!(tag.segments() == ["Java Language Specification"]);
        check!(tag.holder() == Some("java.lang.Object"));
        check!(tag.url() == "java.base/java/lang/Object.html#jls");
    }

    #[test]
    fn test_order_ignores_case_first() {
        let util = java_util();
        let lower = SearchableEntity::type_(&util, "abc", None);
        let upper = SearchableEntity::type_(&util, "ABD", None);
        let list = SearchableEntity::type_(&util, "List", None);
        let mut entities = vec![list.clone(), upper.clone(), lower.clone()];
        entities.sort();
        check!(entities == vec![lower, upper, list]);
    }

    #[test]
    fn test_equality_is_structural() {
        let a = SearchableEntity::type_(&java_util(), "List", None);
        let b = SearchableEntity::type_(&java_util(), "List", None);
        check!(a == b);
        check!(a.cmp(&b) == Ordering::Equal);
        check!(a != SearchableEntity::type_(&java_util(), "Lists", None));
    }

    #[test]
    fn test_index_iterates_all_kinds() {
        let module = SearchableEntity::module("java.base");
        let package = java_util();
        let index = JavadocIndex {
            modules: vec![module.clone()],
            packages: vec![package.clone()],
            ..JavadocIndex::default()
        };
        check!(index.len() == 2);
        check!(index.iter().cloned().collect::<Vec<_>>() == vec![module, package]);
    }
}
