//! Paginated collection in bounded-concurrency waves
//!
//! Page 1 is fetched alone to learn the page count. The remaining pages are
//! requested `wave_width` at a time and stitched back together in page order,
//! so the collected sequence is identical regardless of wave width or of the
//! order in which responses arrive.

use crate::error::UpstreamError;
use crate::github::StarredSource;
use crate::stars_cache_key;
use futures_util::future::try_join_all;
use metrics::counter;
use starmap_cache::TtlCache;
use starmap_core::{Item, ItemPage, RawItem};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub page_size: u32,
    /// Pages requested concurrently after the first
    pub wave_width: usize,
    /// Hard cap on pages fetched per subject
    pub max_pages: u32,
    /// How long a collected list stays cached
    pub ttl: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            wave_width: 3,
            max_pages: 50,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Fetches every starred repository of a subject and caches the result.
pub struct Collector {
    source: Arc<dyn StarredSource>,
    cache: Arc<TtlCache<Arc<[Item]>>>,
    config: CollectorConfig,
}

impl Collector {
    pub fn new(
        source: Arc<dyn StarredSource>,
        cache: Arc<TtlCache<Arc<[Item]>>>,
        config: CollectorConfig,
    ) -> Self {
        Self {
            source,
            cache,
            config,
        }
    }

    /// Return the full, normalized list of starred items for `subject`.
    ///
    /// Any failing page aborts the whole collection; nothing partial is
    /// returned or cached. An empty first page yields an empty list.
    #[instrument(skip(self))]
    pub async fn collect(&self, subject: &str) -> Result<Arc<[Item]>, UpstreamError> {
        let key = stars_cache_key(subject);
        if let Some(items) = self.cache.get(&key) {
            counter!("starmap.cache.hits", 1, "cache" => "stars");
            debug!(items = items.len(), "Serving starred items from cache");
            return Ok(items);
        }

        let first = self.fetch(subject, 1).await?;
        if first.is_empty() {
            info!("Subject has no starred items");
            return Ok(Arc::from(Vec::new()));
        }

        let mut pages = Vec::new();
        let last_page = first.last_page;
        let has_more = first.has_more;
        pages.push(first.items);

        match last_page {
            Some(last) => self.fetch_known(subject, last, &mut pages).await?,
            None if has_more => self.fetch_open_ended(subject, &mut pages).await?,
            None => {}
        }

        let page_count = pages.len();
        let items: Arc<[Item]> = Arc::from(normalize(pages));
        counter!("starmap.upstream.pages", page_count as u64);
        info!(pages = page_count, items = items.len(), "Collected starred items");

        self.cache.set(key, items.clone(), self.config.ttl);
        Ok(items)
    }

    /// Pages `2..=last` are known up front; fetch them in fixed waves.
    async fn fetch_known(
        &self,
        subject: &str,
        last: u32,
        pages: &mut Vec<Vec<RawItem>>,
    ) -> Result<(), UpstreamError> {
        let max_pages = self.config.max_pages.max(1);
        let last = if last > max_pages {
            warn!(
                advertised = last,
                max_pages, "Truncating collection at max_pages"
            );
            max_pages
        } else {
            last
        };

        let remaining: Vec<u32> = (2..=last).collect();
        for wave in remaining.chunks(self.wave_width()) {
            let fetched = self.fetch_wave(subject, wave).await?;
            pages.extend(fetched.into_iter().map(|page| page.items));
        }
        Ok(())
    }

    /// No page count was advertised but more pages exist: keep issuing waves
    /// until a page reports the end or comes back empty.
    async fn fetch_open_ended(
        &self,
        subject: &str,
        pages: &mut Vec<Vec<RawItem>>,
    ) -> Result<(), UpstreamError> {
        let max_pages = self.config.max_pages.max(1);
        let width = self.wave_width() as u32;
        let mut next = 2u32;

        while next <= max_pages {
            let end = next.saturating_add(width - 1).min(max_pages);
            let wave: Vec<u32> = (next..=end).collect();
            for page in self.fetch_wave(subject, &wave).await? {
                let done = page.is_empty() || !page.has_more;
                if !page.is_empty() {
                    pages.push(page.items);
                }
                if done {
                    return Ok(());
                }
            }
            next = end + 1;
        }

        warn!(max_pages, "Truncating collection at max_pages");
        Ok(())
    }

    async fn fetch_wave(&self, subject: &str, wave: &[u32]) -> Result<Vec<ItemPage>, UpstreamError> {
        debug!(pages = ?wave, "Fetching wave");
        // try_join_all preserves input order and drops the rest on first error
        try_join_all(wave.iter().map(|&page| self.fetch(subject, page))).await
    }

    async fn fetch(&self, subject: &str, page: u32) -> Result<ItemPage, UpstreamError> {
        self.source
            .list_starred(subject, page, self.config.page_size)
            .await
            .map_err(|e| {
                warn!(page, error = %e, "Starred page fetch failed");
                e
            })
    }

    fn wave_width(&self) -> usize {
        self.config.wave_width.max(1)
    }
}

/// Flatten pages in order, normalize each record and keep the first
/// occurrence of every `full_name`. Pages can shift while they are being
/// fetched, which surfaces the same repository twice.
fn normalize(pages: Vec<Vec<RawItem>>) -> Vec<Item> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for raw in pages.into_iter().flatten() {
        if raw.full_name.trim().is_empty() {
            continue;
        }
        let item = Item::from(raw);
        if seen.insert(item.full_name.clone()) {
            items.push(item);
        } else {
            debug!(name = %item.full_name, "Skipping repeated item");
        }
    }
    items
}
