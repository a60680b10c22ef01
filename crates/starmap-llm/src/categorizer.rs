//! Batch categorization with a single fallback attempt
//!
//! Each batch walks a small state machine:
//!
//! ```text
//! Dispatch(primary) --ok--> Done
//!        |
//!     failure (parse / transport / timeout)
//!        v
//! Dispatch(fallback) --ok--> Done
//!        |
//!     failure
//!        v
//!    Exhausted --> empty map
//! ```

use crate::backend::ChatBackend;
use crate::error::DispatchError;
use crate::prompt::build_prompt;
use futures_util::future::join_all;
use metrics::{counter, histogram};
use starmap_core::{parse_category_response, Batch, CategoryMap, ParseError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct CategorizerConfig {
    pub primary_timeout: Duration,
    pub fallback_timeout: Duration,
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            primary_timeout: Duration::from_secs(60),
            fallback_timeout: Duration::from_secs(90),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Primary,
    Fallback,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::Primary => "primary",
            Stage::Fallback => "fallback",
        }
    }
}

enum State {
    Dispatch(Stage),
    Failed(Stage, DispatchError),
    Done(Stage, CategoryMap),
    Exhausted(DispatchError),
}

pub struct BatchCategorizer {
    primary: Arc<dyn ChatBackend>,
    fallback: Arc<dyn ChatBackend>,
    config: CategorizerConfig,
}

impl BatchCategorizer {
    pub fn new(
        primary: Arc<dyn ChatBackend>,
        fallback: Arc<dyn ChatBackend>,
        config: CategorizerConfig,
    ) -> Self {
        Self {
            primary,
            fallback,
            config,
        }
    }

    /// Categorize every batch concurrently. Results are in batch order.
    pub async fn categorize_all(&self, batches: &[Batch<'_>]) -> Vec<CategoryMap> {
        info!(batches = batches.len(), "Dispatching batches");
        join_all(batches.iter().map(|batch| self.categorize(batch))).await
    }

    /// Categorize one batch. Never fails: an exhausted batch yields an empty map.
    pub async fn categorize(&self, batch: &Batch<'_>) -> CategoryMap {
        let prompt = build_prompt(batch);
        let known = known_names(batch);
        let started = Instant::now();

        let mut state = State::Dispatch(Stage::Primary);
        loop {
            state = match state {
                State::Dispatch(stage) => match self.dispatch(stage, &prompt, &known).await {
                    Ok(map) => State::Done(stage, map),
                    Err(err) => State::Failed(stage, err),
                },
                State::Failed(Stage::Primary, err) => {
                    warn!(
                        batch = batch.index,
                        stage = "primary",
                        kind = err.kind(),
                        error = %err,
                        "Batch dispatch failed, retrying with fallback"
                    );
                    counter!("starmap.batch.fallbacks", 1, "reason" => err.kind());
                    State::Dispatch(Stage::Fallback)
                }
                State::Failed(Stage::Fallback, err) => State::Exhausted(err),
                State::Done(stage, map) => {
                    debug!(
                        batch = batch.index,
                        stage = stage.as_str(),
                        categories = map.len(),
                        "Batch categorized"
                    );
                    histogram!(
                        "starmap.batch.latency_ms",
                        started.elapsed().as_secs_f64() * 1000.0,
                        "stage" => stage.as_str()
                    );
                    return map;
                }
                State::Exhausted(err) => {
                    warn!(
                        batch = batch.index,
                        stage = "fallback",
                        kind = err.kind(),
                        error = %err,
                        items = batch.len(),
                        "Batch exhausted, contributing no categories"
                    );
                    counter!("starmap.batch.exhausted", 1);
                    return CategoryMap::new();
                }
            };
        }
    }

    async fn dispatch(
        &self,
        stage: Stage,
        prompt: &str,
        known: &HashMap<String, &str>,
    ) -> Result<CategoryMap, DispatchError> {
        let (backend, limit) = match stage {
            Stage::Primary => (&self.primary, self.config.primary_timeout),
            Stage::Fallback => (&self.fallback, self.config.fallback_timeout),
        };
        counter!("starmap.batch.dispatches", 1, "stage" => stage.as_str());
        debug!(
            stage = stage.as_str(),
            backend = backend.name(),
            model = backend.model(),
            "Dispatching batch"
        );

        let text = tokio::time::timeout(limit, backend.complete(prompt))
            .await
            .map_err(|_| DispatchError::Timeout(limit))??;

        let parsed = parse_category_response(&text)?;
        let map = restrict_to_batch(parsed, known);
        if map.is_empty() {
            return Err(ParseError::NoCategories.into());
        }
        Ok(map)
    }
}

/// Lowercased full name to the spelling used in the batch.
fn known_names<'a>(batch: &Batch<'a>) -> HashMap<String, &'a str> {
    batch
        .names()
        .map(|name| (name.to_lowercase(), name))
        .collect()
}

/// Keep only names that belong to the batch, restoring their canonical
/// spelling. Models occasionally invent repositories or change case.
fn restrict_to_batch(parsed: CategoryMap, known: &HashMap<String, &str>) -> CategoryMap {
    let mut map = CategoryMap::new();
    for (category, names) in parsed.iter() {
        for name in names {
            match known.get(&name.to_lowercase()) {
                Some(canonical) => {
                    map.insert(category, *canonical);
                }
                None => debug!(name = %name, "Dropping name not present in batch"),
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use async_trait::async_trait;
    use starmap_core::{partition, Item};
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Text(&'static str),
        Fail,
        Hang,
    }

    struct ScriptedBackend {
        name: &'static str,
        reply: Reply,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(name: &'static str, reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn name(&self) -> &str {
            self.name
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Fail => Err(BackendError::Status {
                    status: 503,
                    message: "overloaded".into(),
                }),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok("{}".to_string())
                }
            }
        }
    }

    fn items() -> Vec<Item> {
        vec![Item::new("o/a"), Item::new("o/b")]
    }

    fn categorizer(primary: Arc<ScriptedBackend>, fallback: Arc<ScriptedBackend>) -> BatchCategorizer {
        BatchCategorizer::new(primary, fallback, CategorizerConfig::default())
    }

    #[tokio::test]
    async fn primary_success_is_used_verbatim() {
        let primary = ScriptedBackend::new("primary", Reply::Text(r#"{"Web":["o/a"],"Data":["o/b"]}"#));
        let fallback = ScriptedBackend::new("fallback", Reply::Fail);
        let items = items();
        let batches = partition(&items, 10);

        let map = categorizer(primary.clone(), fallback.clone())
            .categorize(&batches[0])
            .await;

        let expected: CategoryMap = [("Web", vec!["o/a"]), ("Data", vec!["o/b"])]
            .into_iter()
            .collect();
        assert_eq!(map, expected);
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_primary_falls_back() {
        let primary = ScriptedBackend::new("primary", Reply::Text("Sorry, I can't help with that."));
        let fallback = ScriptedBackend::new(
            "fallback",
            Reply::Text("Here you go:\n```json\n{\"Tools\": [\"o/a\", \"o/b\"]}\n```"),
        );
        let items = items();
        let batches = partition(&items, 10);

        let map = categorizer(primary.clone(), fallback.clone())
            .categorize(&batches[0])
            .await;

        assert_eq!(map.get("Tools").unwrap(), ["o/a", "o/b"]);
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn primary_timeout_falls_back() {
        let primary = ScriptedBackend::new("primary", Reply::Hang);
        let fallback = ScriptedBackend::new("fallback", Reply::Text(r#"{"Web":["o/a"]}"#));
        let items = items();
        let batches = partition(&items, 10);

        let map = categorizer(primary, fallback.clone())
            .categorize(&batches[0])
            .await;

        assert_eq!(map.get("Web").unwrap(), ["o/a"]);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_batch_yields_empty_map() {
        let primary = ScriptedBackend::new("primary", Reply::Fail);
        let fallback = ScriptedBackend::new("fallback", Reply::Hang);
        let items = items();
        let batches = partition(&items, 10);

        let map = categorizer(primary.clone(), fallback.clone())
            .categorize(&batches[0])
            .await;

        assert!(map.is_empty());
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_names_are_dropped_and_case_restored() {
        let primary = ScriptedBackend::new(
            "primary",
            Reply::Text(r#"{"Web":["O/A","made/up"],"Ghosts":["nobody/here"]}"#),
        );
        let fallback = ScriptedBackend::new("fallback", Reply::Fail);
        let items = items();
        let batches = partition(&items, 10);

        let map = categorizer(primary, fallback).categorize(&batches[0]).await;

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Web").unwrap(), ["o/a"]);
    }

    #[tokio::test]
    async fn only_invented_names_count_as_parse_failure() {
        let primary = ScriptedBackend::new("primary", Reply::Text(r#"{"Web":["made/up"]}"#));
        let fallback = ScriptedBackend::new("fallback", Reply::Text(r#"{"Data":["o/b"]}"#));
        let items = items();
        let batches = partition(&items, 10);

        let map = categorizer(primary, fallback.clone())
            .categorize(&batches[0])
            .await;

        assert_eq!(map.get("Data").unwrap(), ["o/b"]);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn categorize_all_keeps_batch_order() {
        let primary = ScriptedBackend::new(
            "primary",
            Reply::Text(r#"{"Web":["o/a"],"Data":["o/b"],"Misc":["o/c"]}"#),
        );
        let fallback = ScriptedBackend::new("fallback", Reply::Fail);
        let items = vec![Item::new("o/a"), Item::new("o/b"), Item::new("o/c")];
        let batches = partition(&items, 1);

        let maps = categorizer(primary.clone(), fallback)
            .categorize_all(&batches)
            .await;

        assert_eq!(maps.len(), 3);
        assert_eq!(maps[0].get("Web").unwrap(), ["o/a"]);
        assert_eq!(maps[1].get("Data").unwrap(), ["o/b"]);
        assert_eq!(maps[2].get("Misc").unwrap(), ["o/c"]);
        assert_eq!(primary.calls(), 3);
    }
}
