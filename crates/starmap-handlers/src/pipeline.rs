//! End-to-end categorization of one subject
//!
//! validate -> coalesce -> category cache -> collect -> score -> partition ->
//! categorize batches concurrently -> merge -> cache

use crate::error::StarmapError;
use crate::response::{CategorizeResponse, NoItemsResponse, Outcome};
use crate::subject::validate_subject;
use metrics::{counter, histogram};
use starmap_cache::{CoalesceError, RequestCoalescer, TtlCache};
use starmap_core::{batch_size, merge, partition, with_uncategorized, ComplexityReport};
use starmap_llm::BatchCategorizer;
use starmap_upstream::Collector;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Cache key under which a subject's categorization is stored.
pub fn categories_cache_key(subject: &str) -> String {
    format!("categories:{}", subject.to_lowercase())
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub categories_ttl: Duration,
    pub coalesce_grace: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            categories_ttl: Duration::from_secs(3600),
            coalesce_grace: Duration::from_secs(60),
        }
    }
}

/// Shared, cheaply clonable handle to the categorization pipeline.
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<Stages>,
    coalescer: Arc<RequestCoalescer<Outcome, StarmapError>>,
}

struct Stages {
    collector: Collector,
    categorizer: BatchCategorizer,
    categories: Arc<TtlCache<CategorizeResponse>>,
    categories_ttl: Duration,
}

impl Pipeline {
    pub fn new(
        collector: Collector,
        categorizer: BatchCategorizer,
        categories: Arc<TtlCache<CategorizeResponse>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            stages: Arc::new(Stages {
                collector,
                categorizer,
                categories,
                categories_ttl: config.categories_ttl,
            }),
            coalescer: Arc::new(RequestCoalescer::new(config.coalesce_grace)),
        }
    }

    /// Categorize the starred repositories of `subject`.
    ///
    /// Concurrent calls for the same subject share one run. Only an invalid
    /// subject or an upstream failure surfaces as an error.
    #[instrument(skip(self))]
    pub async fn categorize(&self, subject: &str) -> Result<Outcome, StarmapError> {
        let started = Instant::now();
        let subject = validate_subject(subject)?;
        counter!("starmap.requests", 1);

        let key = categories_cache_key(&subject);
        let stages = Arc::clone(&self.stages);
        let result = self
            .coalescer
            .run(&key, move || async move { stages.run(&subject).await })
            .await
            .map_err(|err| match err {
                CoalesceError::Failed(err) => err,
                CoalesceError::Aborted(reason) => {
                    warn!(reason = %reason, "Categorization run aborted");
                    StarmapError::InternalError {
                        message: "categorization was interrupted".into(),
                    }
                }
            });

        histogram!(
            "starmap.request.latency_ms",
            started.elapsed().as_secs_f64() * 1000.0
        );
        if let Err(err) = &result {
            counter!("starmap.requests.failed", 1, "error" => err.error_type());
        }
        result
    }

    /// Subjects with a pending or recently completed run
    pub fn in_flight(&self) -> usize {
        self.coalescer.in_flight()
    }
}

impl Stages {
    async fn run(&self, subject: &str) -> Result<Outcome, StarmapError> {
        let started = Instant::now();
        let key = categories_cache_key(subject);

        if let Some(mut cached) = self.categories.get(&key) {
            counter!("starmap.cache.hits", 1, "cache" => "categories");
            debug!(subject, "Serving categories from cache");
            cached.elapsed_ms = elapsed_ms(started);
            return Ok(Outcome::Categorized(cached));
        }

        let items = self.collector.collect(subject).await?;
        if items.is_empty() {
            info!(subject, "No starred repositories");
            return Ok(Outcome::NoItems(NoItemsResponse::for_subject(subject)));
        }

        let report = ComplexityReport::from_items(&items);
        let size = batch_size(report.score, items.len());
        let batches = partition(&items, size);
        info!(
            subject,
            items = items.len(),
            score = report.score,
            description_factor = report.description_factor,
            language_diversity = report.language_diversity,
            topic_density = report.topic_density,
            batch_size = size,
            batches = batches.len(),
            "Categorizing starred repositories"
        );

        let results = self.categorizer.categorize_all(&batches).await;
        let succeeded = results.iter().filter(|map| !map.is_empty()).count();
        let categories = with_uncategorized(merge(&results), &items);

        let response = CategorizeResponse::new(categories, items.len(), elapsed_ms(started));
        info!(
            subject,
            categories = response.category_count,
            batches_succeeded = succeeded,
            batches = batches.len(),
            elapsed_ms = response.elapsed_ms,
            "Categorization complete"
        );

        self.categories
            .set(key, response.clone(), self.categories_ttl);
        Ok(Outcome::Categorized(response))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}
