//! Response shapes shared by the HTTP server and the CLI

use crate::error::StarmapError;
use serde::{Deserialize, Serialize};
use starmap_core::CategoryMap;

/// Result of a successful categorization.
///
/// Serializes in the shape the catalog store accepts as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizeResponse {
    pub category_count: usize,
    pub categories: CategoryMap,
    pub item_count: usize,
    pub elapsed_ms: u64,
}

impl CategorizeResponse {
    pub fn new(categories: CategoryMap, item_count: usize, elapsed_ms: u64) -> Self {
        Self {
            category_count: categories.len(),
            categories,
            item_count,
            elapsed_ms,
        }
    }
}

/// Returned instead of an empty map when the subject has starred nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoItemsResponse {
    pub item_count: usize,
    pub no_items: bool,
    pub fallback_fact: String,
}

const FACTS: &[&str] = &[
    "Starring a repository is also a bookmark: your stars are listed at github.com/<you>?tab=stars.",
    "GitHub stars were introduced in 2012, replacing the older 'watch' button for bookmarking.",
    "Star lists let you group starred repositories into named collections.",
    "Maintainers often use star counts to gauge interest before investing in a feature.",
    "Starring a repository you depend on is a low-effort way to thank its maintainers.",
];

impl NoItemsResponse {
    /// Pick a fact deterministically so repeated requests agree.
    pub fn for_subject(subject: &str) -> Self {
        let index = subject
            .to_lowercase()
            .bytes()
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
            % FACTS.len();
        Self {
            item_count: 0,
            no_items: true,
            fallback_fact: FACTS[index].to_string(),
        }
    }
}

/// Terminal state of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    Categorized(CategorizeResponse),
    NoItems(NoItemsResponse),
}

impl Outcome {
    pub fn item_count(&self) -> usize {
        match self {
            Outcome::Categorized(response) => response.item_count,
            Outcome::NoItems(_) => 0,
        }
    }
}

/// Error body: `{error, message, retryable?, hint?}`. Never carries prompts
/// or internal traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<&StarmapError> for ErrorEnvelope {
    fn from(err: &StarmapError) -> Self {
        Self {
            error: err.error_type().to_string(),
            message: err.message(),
            retryable: err.retryable().then_some(true),
            hint: err.hint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn categorized_shape() {
        let categories: CategoryMap = [("Web", vec!["o/a"]), ("Data", vec!["o/b"])]
            .into_iter()
            .collect();
        let outcome = Outcome::Categorized(CategorizeResponse::new(categories, 2, 15));

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "categoryCount": 2,
                "categories": {"Web": ["o/a"], "Data": ["o/b"]},
                "itemCount": 2,
                "elapsedMs": 15
            })
        );
    }

    #[test]
    fn no_items_shape() {
        let outcome = Outcome::NoItems(NoItemsResponse::for_subject("Octocat"));
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["itemCount"], 0);
        assert_eq!(value["noItems"], true);
        assert!(value["fallbackFact"].as_str().unwrap().len() > 10);
        assert_eq!(
            NoItemsResponse::for_subject("octocat"),
            NoItemsResponse::for_subject("OCTOCAT")
        );
    }

    #[test]
    fn envelope_omits_empty_fields() {
        let err = StarmapError::UserNotFound {
            subject: "ghost".into(),
        };
        let value = serde_json::to_value(ErrorEnvelope::from(&err)).unwrap();
        assert_eq!(
            value,
            json!({"error": "UserNotFound", "message": "GitHub user 'ghost' was not found"})
        );

        let err = StarmapError::RateLimited { reset_at: None };
        let value = serde_json::to_value(ErrorEnvelope::from(&err)).unwrap();
        assert_eq!(value["retryable"], true);
        assert!(value["hint"].is_string());
    }
}
