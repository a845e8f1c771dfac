use crate::classify::{classify, CategoryCursor, Step};
use crate::error::Result;
use crate::normalize::normalize_category;
use crate::statement::{open_statements, ScanConfig, Statements};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::io::BufRead;
use std::path::Path;

/// A category discovered in the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// Categories and their alias index, built by one forward scan
///
/// Read-only once built. Share it by reference (or behind an `Arc`) with
/// every query path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRegistry {
    /// Categories in discovery order
    categories: Vec<Category>,

    /// Category id -> position in `categories`
    id_lookup: FxHashMap<String, usize>,

    /// Normalized alias -> position in `categories`
    aliases: FxHashMap<String, usize>,
}

impl CategoryRegistry {
    /// Build from a statement stream
    ///
    /// A plain iterator cannot report read errors; use
    /// [`CategoryRegistry::build_from_stream`] for file-backed input.
    pub fn build<I>(statements: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut registry = Self::default();
        let mut cursor = CategoryCursor::new();

        for statement in statements {
            if cursor.advance(classify(&statement)) == Step::CategoryChanged {
                registry.record(cursor.id(), cursor.name());
            }
        }

        registry.build_aliases();
        registry
    }

    /// Build from a statement stream, failing if a read breaks off mid-scan
    pub fn build_from_stream<R: BufRead>(mut statements: Statements<R>) -> Result<Self> {
        let registry = Self::build(statements.by_ref());

        match statements.take_error() {
            Some(e) => Err(e.into()),
            None => Ok(registry),
        }
    }

    /// Record `id -> name`; a repeated id keeps its slot and takes the new name
    fn record(&mut self, id: &str, name: &str) {
        match self.id_lookup.get(id) {
            Some(&idx) => self.categories[idx].name = name.to_string(),
            None => {
                self.id_lookup.insert(id.to_string(), self.categories.len());
                self.categories.push(Category {
                    id: id.to_string(),
                    name: name.to_string(),
                });
            }
        }
    }

    /// Derive alias keys for every category. Later writes win on collision.
    fn build_aliases(&mut self) {
        for (idx, category) in self.categories.iter().enumerate() {
            let id_key = normalize_category(&category.id);
            let name_key = normalize_category(&category.name);
            let stripped = name_key.strip_prefix("the ").map(str::to_string);
            // `Rock/Pop` also answers to `rock pop`
            let slash_as_space = category
                .name
                .contains('/')
                .then(|| normalize_category(&category.name.replace('/', " ")));

            let keys = [Some(id_key), slash_as_space, Some(name_key), stripped];
            for key in keys.into_iter().flatten() {
                if !key.is_empty() {
                    self.aliases.insert(key, idx);
                }
            }
        }
    }

    /// Number of distinct categories
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Number of alias keys
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// All categories in discovery order
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Display name for a category id
    pub fn name_for(&self, id: &str) -> Option<&str> {
        self.id_lookup
            .get(id)
            .map(|&idx| self.categories[idx].name.as_str())
    }

    /// Map of category id to display name
    pub fn id_to_name(&self) -> FxHashMap<&str, &str> {
        self.categories
            .iter()
            .map(|c| (c.id.as_str(), c.name.as_str()))
            .collect()
    }

    /// Map of alias key to the category it resolves to
    pub fn alias_index(&self) -> FxHashMap<&str, &Category> {
        self.aliases
            .iter()
            .map(|(key, &idx)| (key.as_str(), &self.categories[idx]))
            .collect()
    }

    /// Resolve user-typed text to a category
    pub fn resolve_alias(&self, raw: &str) -> Option<&Category> {
        let key = normalize_category(raw);
        self.aliases.get(&key).map(|&idx| &self.categories[idx])
    }

    /// Categories whose alias keys contain the normalized query
    ///
    /// One entry per category, sorted by name then id (case-insensitive).
    /// An empty normalized query matches nothing.
    pub fn search(&self, query: &str) -> Vec<&Category> {
        let needle = normalize_category(query);
        if needle.is_empty() {
            return Vec::new();
        }

        let mut seen = FxHashSet::default();
        let mut matches: Vec<&Category> = self
            .aliases
            .iter()
            .filter(|(key, _)| key.contains(&needle))
            .filter(|&(_, &idx)| seen.insert(idx))
            .map(|(_, &idx)| &self.categories[idx])
            .collect();

        matches.sort_by_cached_key(|c| (c.name.to_lowercase(), c.id.to_lowercase()));
        matches
    }
}

/// Scan the dataset once and build its category registry
pub fn build_category_index(path: &Path, config: &ScanConfig) -> Result<CategoryRegistry> {
    let statements = open_statements(path, config)?;
    let registry = CategoryRegistry::build_from_stream(statements)?;

    log::info!(
        "Category index built: {} categories, {} aliases",
        registry.category_count(),
        registry.alias_count()
    );

    Ok(registry)
}

/// Resolve user-typed text to `(id, name)`, or `None` when no alias matches
pub fn resolve_category_alias<'a>(
    registry: &'a CategoryRegistry,
    raw: &str,
) -> Option<(&'a str, &'a str)> {
    registry
        .resolve_alias(raw)
        .map(|c| (c.id.as_str(), c.name.as_str()))
}

/// Substring search over category names and ids, as `(name, id)` pairs
pub fn search_categories<'a>(registry: &'a CategoryRegistry, query: &str) -> Vec<(&'a str, &'a str)> {
    registry
        .search(query)
        .into_iter()
        .map(|c| (c.name.as_str(), c.id.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverError;
    use crate::statement::tests::FailingReader;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DATASET: &str = "\
var r0 = {'category_id': '1', 'name': 'Foods & Drinks'};
r1.push({'word': 'Bread', 'hint': 'Yeast'});
r0 = {'category_id': '2', 'name': 'Sports'};
r0 = {'category_id': 'ocean', 'name': 'The Deep Sea'};
r0 = {'category_id': '9', name: broken};
";

    fn registry_from(text: &str) -> CategoryRegistry {
        CategoryRegistry::build(text.lines().map(str::to_string))
    }

    #[test]
    fn test_discovers_categories_in_order() {
        let registry = registry_from(DATASET);
        let ids: Vec<&str> = registry.categories().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "ocean"]);
        assert_eq!(registry.name_for("2"), Some("Sports"));
        assert_eq!(registry.name_for("9"), None);
    }

    #[test]
    fn test_alias_resolution() {
        let registry = registry_from(DATASET);

        let expected = Some(("1", "Foods & Drinks"));
        assert_eq!(resolve_category_alias(&registry, "foods and drinks"), expected);
        assert_eq!(resolve_category_alias(&registry, "Foods & Drinks"), expected);
        assert_eq!(resolve_category_alias(&registry, "foods/drinks"), expected);
        assert_eq!(resolve_category_alias(&registry, "1"), expected);
        assert_eq!(resolve_category_alias(&registry, "nonexistent"), None);
    }

    #[test]
    fn test_the_prefix_alias() {
        let registry = registry_from(DATASET);
        let expected = Some(("ocean", "The Deep Sea"));
        assert_eq!(resolve_category_alias(&registry, "the deep sea"), expected);
        assert_eq!(resolve_category_alias(&registry, "Deep Sea"), expected);
        assert_eq!(resolve_category_alias(&registry, "OCEAN"), expected);
    }

    #[test]
    fn test_alias_count() {
        let registry = registry_from(DATASET);
        // 1: "1", "foods and drinks"; 2: "2", "sports"; ocean: "ocean", "the deep sea", "deep sea"
        assert_eq!(registry.alias_count(), 7);
        assert_eq!(registry.alias_index().len(), 7);
    }

    #[test]
    fn test_alias_collision_last_write_wins() {
        let registry = registry_from(
            "r0 = {'category_id': 'a', 'name': 'Rock & Roll'};\n\
             r0 = {'category_id': 'b', 'name': 'Rock and Roll'};\n",
        );
        assert_eq!(resolve_category_alias(&registry, "rock and roll"), Some(("b", "Rock and Roll")));
        assert_eq!(resolve_category_alias(&registry, "a"), Some(("a", "Rock & Roll")));
    }

    #[test]
    fn test_repeated_id_takes_latest_name() {
        let registry = registry_from(
            "r0 = {'category_id': '1', 'name': 'Old'};\n\
             r0 = {'category_id': '1', 'name': 'New'};\n",
        );
        assert_eq!(registry.category_count(), 1);
        assert_eq!(registry.name_for("1"), Some("New"));
    }

    #[test]
    fn test_search_dedupes_and_sorts() {
        let registry = registry_from(
            "r0 = {'category_id': 'drinks', 'name': 'Soft Drinks'};\n\
             r0 = {'category_id': '1', 'name': 'Foods & Drinks'};\n\
             r0 = {'category_id': '2', 'name': 'Sports'};\n",
        );

        let found = search_categories(&registry, "drink");
        assert_eq!(found, vec![("Foods & Drinks", "1"), ("Soft Drinks", "drinks")]);
    }

    #[test]
    fn test_search_empty_query() {
        let registry = registry_from(DATASET);
        assert!(registry.search("  !! ").is_empty());
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(DATASET.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = ScanConfig::default();
        let first = build_category_index(file.path(), &config).unwrap();
        let second = build_category_index(file.path(), &config).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.id_to_name(), second.id_to_name());
        assert_eq!(first.alias_index(), second.alias_index());
    }

    #[test]
    fn test_read_error_fails_the_build() {
        let reader = FailingReader::new("r0 = {'category_id': '1', 'name': 'A'};\n");
        let result = CategoryRegistry::build_from_stream(Statements::new(reader, 1024));
        assert!(matches!(result, Err(SolverError::Io(_))));
    }

    #[test]
    fn test_stream_build_matches_plain_build() {
        let statements = Statements::new(DATASET.as_bytes(), 1024);
        let registry = CategoryRegistry::build_from_stream(statements).unwrap();
        assert_eq!(registry, registry_from(DATASET));
    }

    #[test]
    fn test_slash_name_resolves_either_way() {
        let registry = registry_from("r0 = {'category_id': '7', 'name': 'Rock/Pop'};\n");
        for alias in ["rock pop", "rock and pop", "Rock/Pop", "7"] {
            assert_eq!(registry.resolve_alias(alias).map(|c| c.id.as_str()), Some("7"), "{alias}");
        }
        assert_eq!(registry.alias_count(), 3);
    }

    #[test]
    fn test_build_missing_file() {
        let result = build_category_index(Path::new("/nonexistent/words.js"), &ScanConfig::default());
        assert!(result.is_err());
    }
}
