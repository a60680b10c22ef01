//! Category name to repository names mapping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Bucket used when no batch produced a usable categorization.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Ordered mapping of category name to de-duplicated repository names.
///
/// Category names are trimmed on insert. Each value keeps first-seen order
/// and never contains the same name twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMap {
    inner: IndexMap<String, Vec<String>>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name` under `category` unless already present there.
    ///
    /// Returns `true` when the name was inserted. Blank category names are
    /// ignored.
    pub fn insert(&mut self, category: &str, name: impl Into<String>) -> bool {
        let category = category.trim();
        if category.is_empty() {
            return false;
        }

        let name = name.into();
        let names = self.inner.entry(category.to_string()).or_default();
        if names.contains(&name) {
            return false;
        }
        names.push(name);
        true
    }

    /// Ensure a category exists, even without names. Used while merging.
    pub(crate) fn ensure_category(&mut self, category: &str) {
        let category = category.trim();
        if !category.is_empty() {
            self.inner.entry(category.to_string()).or_default();
        }
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.inner.get(category.trim()).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Total number of names across all categories.
    pub fn item_count(&self) -> usize {
        self.inner.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner
            .iter()
            .map(|(category, names)| (category.as_str(), names.as_slice()))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// Drop categories whose name list is empty.
    pub fn prune_empty(&mut self) {
        self.inner.retain(|_, names| !names.is_empty());
    }
}

impl<'a> FromIterator<(&'a str, Vec<&'a str>)> for CategoryMap {
    fn from_iter<T: IntoIterator<Item = (&'a str, Vec<&'a str>)>>(iter: T) -> Self {
        let mut map = CategoryMap::new();
        for (category, names) in iter {
            for name in names {
                map.insert(category, name);
            }
        }
        map
    }
}
