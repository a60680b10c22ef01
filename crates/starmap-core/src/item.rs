//! Starred repository records.
//!
//! [`RawItem`] mirrors the upstream JSON shape and is only used at the
//! boundary. [`Item`] is the normalized, size-bounded record the rest of the
//! pipeline works with.

use serde::{Deserialize, Serialize};

/// Descriptions are truncated to this many characters before prompting.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// At most this many topics are kept per item.
pub const MAX_TOPICS: usize = 10;

/// One starred repository as returned by the upstream API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawItem {
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub stargazers_count: u64,
}

/// A normalized starred repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// `owner/name`, unique within a collection
    pub full_name: String,
    pub description: Option<String>,
    pub primary_language: Option<String>,
    pub topics: Vec<String>,
    pub popularity: u64,
}

impl Item {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            description: None,
            primary_language: None,
            topics: Vec::new(),
            popularity: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.primary_language = Some(language.into());
        self
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Description length in characters, zero when absent.
    pub fn description_len(&self) -> usize {
        self.description
            .as_deref()
            .map(|d| d.chars().count())
            .unwrap_or(0)
    }
}

impl From<RawItem> for Item {
    fn from(raw: RawItem) -> Self {
        let description = raw
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS));

        let primary_language = raw
            .language
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        let topics = raw
            .topics
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .take(MAX_TOPICS)
            .collect();

        Self {
            full_name: raw.full_name,
            description,
            primary_language,
            topics,
            popularity: raw.stargazers_count,
        }
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// One page of upstream results plus its pagination metadata.
#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<RawItem>,
    /// 1-based page index
    pub page_number: u32,
    pub has_more: bool,
    /// Index of the final page when the upstream advertises it
    pub last_page: Option<u32>,
}

impl ItemPage {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_bounds_description_and_topics() {
        let raw = RawItem {
            full_name: "octo/cat".into(),
            description: Some("é".repeat(250)),
            language: Some("Rust".into()),
            topics: (0..15).map(|i| format!("t{i}")).collect(),
            stargazers_count: 42,
        };

        let item = Item::from(raw);
        assert_eq!(item.description_len(), MAX_DESCRIPTION_CHARS);
        assert_eq!(item.topics.len(), MAX_TOPICS);
        assert_eq!(item.topics[0], "t0");
        assert_eq!(item.primary_language.as_deref(), Some("Rust"));
        assert_eq!(item.popularity, 42);
    }

    #[test]
    fn blank_fields_become_none() {
        let raw = RawItem {
            full_name: "octo/empty".into(),
            description: Some("   ".into()),
            language: Some(String::new()),
            topics: vec![" ".into(), "cli".into()],
            stargazers_count: 0,
        };

        let item = Item::from(raw);
        assert_eq!(item.description, None);
        assert_eq!(item.primary_language, None);
        assert_eq!(item.topics, vec!["cli".to_string()]);
    }

    #[test]
    fn raw_item_tolerates_missing_fields() {
        let raw: RawItem = serde_json::from_str(r#"{"full_name":"a/b"}"#).unwrap();
        assert_eq!(raw.full_name, "a/b");
        assert!(raw.topics.is_empty());
        assert_eq!(raw.stargazers_count, 0);
    }
}
