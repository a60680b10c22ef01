//! Complexity scoring and adaptive batch sizing.
//!
//! Richer metadata makes each prompt heavier for the model, so complex
//! collections are split into smaller batches.

use std::collections::HashSet;

use crate::item::Item;

const DESCRIPTION_WEIGHT: f64 = 0.4;
const LANGUAGE_WEIGHT: f64 = 0.3;
const TOPIC_WEIGHT: f64 = 0.3;

/// Average description length at which the description factor saturates.
const DESCRIPTION_SATURATION_CHARS: f64 = 100.0;

const MAX_BATCH: usize = 200;
const BATCH_SPREAD: f64 = 150.0;
const SMALL_COLLECTION: usize = 50;
const LARGE_COLLECTION: usize = 300;
const LARGE_COLLECTION_CAP: usize = 150;

/// Factor breakdown behind a complexity score, useful for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexityReport {
    pub description_factor: f64,
    pub language_diversity: f64,
    pub topic_density: f64,
    pub score: f64,
}

impl ComplexityReport {
    pub fn from_items(items: &[Item]) -> Self {
        if items.is_empty() {
            return Self {
                description_factor: 0.0,
                language_diversity: 0.0,
                topic_density: 0.0,
                score: 0.0,
            };
        }

        let count = items.len() as f64;

        let total_description: usize = items.iter().map(Item::description_len).sum();
        let description_factor =
            (total_description as f64 / count / DESCRIPTION_SATURATION_CHARS).min(1.0);

        let languages: HashSet<&str> = items
            .iter()
            .filter_map(|item| item.primary_language.as_deref())
            .collect();
        let language_diversity = (languages.len() as f64 / count).min(1.0);

        let total_topics: usize = items.iter().map(|item| item.topics.len()).sum();
        let topic_density = (total_topics as f64 / count).min(1.0);

        let score = (description_factor * DESCRIPTION_WEIGHT
            + language_diversity * LANGUAGE_WEIGHT
            + topic_density * TOPIC_WEIGHT)
            .clamp(0.0, 1.0);

        Self {
            description_factor,
            language_diversity,
            topic_density,
            score,
        }
    }
}

/// Weighted complexity of a collection, in `[0, 1]`.
pub fn score(items: &[Item]) -> f64 {
    ComplexityReport::from_items(items).score
}

/// Pick a batch size for `total` items with the given complexity score.
///
/// Simple collections get batches of up to 200, complex ones down to 50.
/// Small collections never exceed their own size; large ones are capped at
/// 150. The result is always at least 1.
pub fn batch_size(score: f64, total: usize) -> usize {
    let score = if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let base = MAX_BATCH - (score * BATCH_SPREAD).floor() as usize;

    let size = if total < SMALL_COLLECTION {
        total.min(base)
    } else if total > LARGE_COLLECTION {
        LARGE_COLLECTION_CAP.min(base)
    } else {
        base
    };

    size.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(n: usize) -> Vec<Item> {
        (0..n).map(|i| Item::new(format!("o/r{i}"))).collect()
    }

    #[test]
    fn bare_items_score_zero() {
        assert_eq!(score(&plain(10)), 0.0);
        assert_eq!(score(&[]), 0.0);
    }

    #[test]
    fn rich_items_score_one() {
        let items: Vec<Item> = (0..4)
            .map(|i| {
                Item::new(format!("o/r{i}"))
                    .with_description("x".repeat(150))
                    .with_language(format!("lang{i}"))
                    .with_topics(["a", "b"])
            })
            .collect();
        let report = ComplexityReport::from_items(&items);
        assert_eq!(report.description_factor, 1.0);
        assert_eq!(report.language_diversity, 1.0);
        assert_eq!(report.topic_density, 1.0);
        assert!((report.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn factors_are_weighted() {
        // avg description 50 chars -> 0.5, one language over two items -> 0.5, no topics
        let items = vec![
            Item::new("o/a").with_description("x".repeat(100)).with_language("Go"),
            Item::new("o/b").with_language("Go"),
        ];
        let s = score(&items);
        assert!((s - (0.5 * 0.4 + 0.5 * 0.3)).abs() < 1e-9);
    }

    #[test]
    fn batch_size_follows_formula() {
        assert_eq!(batch_size(0.0, 100), 200);
        assert_eq!(batch_size(1.0, 100), 50);
        assert_eq!(batch_size(0.5, 100), 125);
        assert_eq!(batch_size(0.333, 200), 200 - 49);
    }

    #[test]
    fn small_collections_clamp_to_total() {
        assert_eq!(batch_size(0.0, 2), 2);
        assert_eq!(batch_size(1.0, 49), 49);
        assert_eq!(batch_size(0.2, 0), 1);
    }

    #[test]
    fn large_collections_cap_at_150() {
        assert_eq!(batch_size(0.0, 500), 150);
        assert_eq!(batch_size(1.0, 500), 50);
        assert_eq!(batch_size(0.9, 301), 65);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        assert_eq!(batch_size(f64::NAN, 100), 200);
        assert_eq!(batch_size(7.0, 100), 50);
        assert_eq!(batch_size(-1.0, 100), 200);
    }
}
