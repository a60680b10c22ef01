//! Merge per-batch category maps into one result.

use std::collections::HashSet;

use tracing::debug;

use crate::category::{CategoryMap, UNCATEGORIZED};
use crate::item::Item;

/// Combine batch results in order.
///
/// Category names are trimmed before being used as keys, so `"Web "` and
/// `"Web"` from different batches land in the same category. A repository
/// name is recorded at most once across the whole merged map; later
/// occurrences are dropped. Categories left empty are pruned.
pub fn merge<'a, I>(results: I) -> CategoryMap
where
    I: IntoIterator<Item = &'a CategoryMap>,
{
    let mut merged = CategoryMap::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut dropped = 0usize;

    for result in results {
        for (category, names) in result.iter() {
            merged.ensure_category(category);
            for name in names {
                if seen.insert(name.as_str()) {
                    merged.insert(category, name.clone());
                } else {
                    dropped += 1;
                }
            }
        }
    }

    merged.prune_empty();

    if dropped > 0 {
        debug!(dropped, "Dropped duplicate repositories while merging");
    }

    merged
}

/// Place every item in an `Uncategorized` bucket when `map` is empty.
pub fn with_uncategorized(map: CategoryMap, items: &[Item]) -> CategoryMap {
    if !map.is_empty() || items.is_empty() {
        return map;
    }

    let mut fallback = CategoryMap::new();
    for item in items {
        fallback.insert(UNCATEGORIZED, item.full_name.clone());
    }
    fallback
}
