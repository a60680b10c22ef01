// Initialization utilities
//
// Pipeline wiring and logging/tracing setup

use anyhow::{Context, Result};
use starmap_cache::TtlCache;
use starmap_config::{LogFormat, RuntimeConfig};
use starmap_handlers::{Pipeline, PipelineConfig};
use starmap_llm::{BatchCategorizer, CategorizerConfig, OpenAiBackend};
use starmap_upstream::{Collector, CollectorConfig, GithubSource, ReqwestHttpClient};
use std::sync::Arc;
use tracing::info;

/// Build the categorization pipeline from RuntimeConfig
pub fn init_pipeline(config: &RuntimeConfig) -> Result<Pipeline> {
    info!(
        "Initializing pipeline: upstream={} primary={} fallback={}",
        config.upstream.api_base, config.primary.model, config.fallback.model
    );

    let http = ReqwestHttpClient::new(config.upstream.timeout())
        .context("Failed to create GitHub HTTP client")?;
    let source = GithubSource::new(Arc::new(http), config.upstream.api_base.clone())
        .with_token(config.upstream.token.clone());

    let collector = Collector::new(
        Arc::new(source),
        Arc::new(TtlCache::new()),
        CollectorConfig {
            page_size: config.upstream.page_size,
            wave_width: config.upstream.wave_width,
            max_pages: config.upstream.max_pages,
            ttl: config.cache.stars_ttl(),
        },
    );

    let primary = OpenAiBackend::from_config("primary", &config.primary)
        .context("Failed to create primary backend")?;
    let fallback = OpenAiBackend::from_config("fallback", &config.fallback)
        .context("Failed to create fallback backend")?;
    let categorizer = BatchCategorizer::new(
        Arc::new(primary),
        Arc::new(fallback),
        CategorizerConfig {
            primary_timeout: config.primary.timeout(),
            fallback_timeout: config.fallback.timeout(),
        },
    );

    Ok(Pipeline::new(
        collector,
        categorizer,
        Arc::new(TtlCache::new()),
        PipelineConfig {
            categories_ttl: config.cache.categories_ttl(),
            coalesce_grace: config.cache.coalesce_grace(),
        },
    ))
}

/// Initialize tracing/logging from RuntimeConfig
///
/// Logs go to stderr so `starmap categorize` can keep stdout for its JSON.
pub fn init_tracing(config: &RuntimeConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Parse log level from config
    let env_filter =
        EnvFilter::try_new(&config.server.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = match config.server.log_format {
        LogFormat::Json => {
            let layer = fmt::layer().json().with_writer(std::io::stderr);
            tracing::subscriber::set_global_default(registry.with(layer))
        }
        LogFormat::Text => {
            let layer = fmt::layer().with_writer(std::io::stderr);
            tracing::subscriber::set_global_default(registry.with(layer))
        }
    };
}
