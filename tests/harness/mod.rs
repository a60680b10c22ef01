//! In-memory test doubles for the upstream and the model backends
//!
//! - `FakeGithub` serves a fixed list of starred repositories in pages
//! - `EchoBackend` answers every prompt by filing each listed repository
//!   under one category
//! - `ScriptedBackend` returns the same canned reply every time
//! - `build_pipeline` wires them together the way `init_pipeline` does

#![allow(dead_code)]

use async_trait::async_trait;
use starmap_cache::TtlCache;
use starmap_core::{ItemPage, RawItem};
use starmap_handlers::{Pipeline, PipelineConfig};
use starmap_llm::{BackendError, BatchCategorizer, CategorizerConfig, ChatBackend};
use starmap_upstream::{Collector, CollectorConfig, StarredSource, UpstreamError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct FakeGithub {
    repos: Vec<RawItem>,
    pub calls: AtomicUsize,
    latency: Duration,
}

impl FakeGithub {
    pub fn new(repos: Vec<RawItem>) -> Arc<Self> {
        Arc::new(Self {
            repos,
            calls: AtomicUsize::new(0),
            latency: Duration::from_millis(25),
        })
    }

    pub fn named(names: &[&str]) -> Arc<Self> {
        Self::new(names.iter().map(|name| repo(name)).collect())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn repo(name: &str) -> RawItem {
    RawItem {
        full_name: name.to_string(),
        ..RawItem::default()
    }
}

#[async_trait]
impl StarredSource for FakeGithub {
    async fn list_starred(
        &self,
        subject: &str,
        page: u32,
        page_size: u32,
    ) -> Result<ItemPage, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;

        match subject {
            "ghost" => {
                return Err(UpstreamError::NotFound {
                    subject: subject.to_string(),
                })
            }
            "throttled" => {
                return Err(UpstreamError::RateLimited {
                    status: 403,
                    reset_at: Some(1_700_000_000),
                })
            }
            "nobody" => {
                return Ok(ItemPage {
                    items: Vec::new(),
                    page_number: page,
                    has_more: false,
                    last_page: None,
                })
            }
            _ => {}
        }

        let size = page_size as usize;
        let total_pages = self.repos.len().div_ceil(size).max(1) as u32;
        let items = self
            .repos
            .iter()
            .skip((page as usize - 1) * size)
            .take(size)
            .cloned()
            .collect();
        let has_more = page < total_pages;
        Ok(ItemPage {
            items,
            page_number: page,
            has_more,
            last_page: has_more.then_some(total_pages),
        })
    }
}

/// Files every repository listed in the prompt under `category`.
pub struct EchoBackend {
    category: &'static str,
    pub calls: AtomicUsize,
}

impl EchoBackend {
    pub fn new(category: &'static str) -> Arc<Self> {
        Arc::new(Self {
            category,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    fn model(&self) -> &str {
        "echo-1"
    }

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let names: Vec<&str> = prompt
            .lines()
            .filter_map(|line| line.strip_prefix("- "))
            .filter_map(|rest| rest.split_whitespace().next())
            .map(|name| name.trim_end_matches(':'))
            .collect();
        let mut reply = serde_json::Map::new();
        reply.insert(self.category.to_string(), serde_json::json!(names));
        let reply = serde_json::Value::Object(reply);
        Ok(format!("Sure! Here is the grouping:\n```json\n{}\n```", reply))
    }
}

pub struct ScriptedBackend {
    reply: Result<&'static str, BackendError>,
    pub calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn ok(text: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err(BackendError::Status {
                status: 500,
                message: "upstream model error".into(),
            }),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map(str::to_string)
    }
}

pub fn build_pipeline(
    source: Arc<dyn StarredSource>,
    primary: Arc<dyn ChatBackend>,
    fallback: Arc<dyn ChatBackend>,
) -> Pipeline {
    let collector = Collector::new(
        source,
        Arc::new(TtlCache::new()),
        CollectorConfig {
            page_size: 100,
            wave_width: 3,
            ..CollectorConfig::default()
        },
    );
    let categorizer = BatchCategorizer::new(
        primary,
        fallback,
        CategorizerConfig {
            primary_timeout: Duration::from_secs(5),
            fallback_timeout: Duration::from_secs(10),
        },
    );
    Pipeline::new(
        collector,
        categorizer,
        Arc::new(TtlCache::new()),
        PipelineConfig::default(),
    )
}
