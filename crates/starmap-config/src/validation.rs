// Configuration validation
//
// Hard errors for values the pipeline cannot run with, warnings for values
// that work but are probably mistakes.

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

/// GitHub rejects `per_page` above this.
const MAX_PAGE_SIZE: u32 = 100;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_server_config(&config.server)?;
    validate_upstream_config(&config.upstream)?;
    validate_backend_config("primary", &config.primary)?;
    validate_backend_config("fallback", &config.fallback)?;
    validate_cache_config(&config.cache)?;

    if config.fallback.timeout_secs < config.primary.timeout_secs {
        warn!(
            primary = config.primary.timeout_secs,
            fallback = config.fallback.timeout_secs,
            "fallback.timeout_secs is shorter than primary.timeout_secs"
        );
    }

    if config.primary.api_base == config.fallback.api_base
        && config.primary.model == config.fallback.model
    {
        warn!(
            model = %config.primary.model,
            "primary and fallback use the same model; retries are unlikely to help"
        );
    }

    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<()> {
    if config.listen_addr.is_empty() {
        bail!("server.listen_addr must not be empty");
    }

    // Basic validation that it looks like an address
    if !config.listen_addr.contains(':') {
        bail!("server.listen_addr must be in format 'host:port'");
    }

    Ok(())
}

fn validate_upstream_config(config: &UpstreamConfig) -> Result<()> {
    if config.api_base.is_empty() {
        bail!("upstream.api_base must not be empty");
    }

    if config.page_size == 0 || config.page_size > MAX_PAGE_SIZE {
        bail!("upstream.page_size must be between 1 and {}", MAX_PAGE_SIZE);
    }

    if config.wave_width == 0 {
        bail!("upstream.wave_width must be greater than 0");
    }

    if config.max_pages == 0 {
        bail!("upstream.max_pages must be greater than 0");
    }

    if config.timeout_secs == 0 {
        bail!("upstream.timeout_secs must be greater than 0");
    }

    if config.wave_width > 10 {
        warn!(
            wave_width = config.wave_width,
            "upstream.wave_width is large; secondary rate limits are likely"
        );
    }

    if config.token.is_none() {
        warn!("No GitHub token configured; unauthenticated requests are limited to 60/hour");
    }

    Ok(())
}

fn validate_backend_config(name: &str, config: &BackendConfig) -> Result<()> {
    if config.api_base.is_empty() {
        bail!("{}.api_base must not be empty", name);
    }

    if config.model.is_empty() {
        bail!("{}.model must not be empty", name);
    }

    if !(0.0..=2.0).contains(&config.temperature) {
        bail!("{}.temperature must be between 0.0 and 2.0", name);
    }

    if config.max_tokens == 0 {
        bail!("{}.max_tokens must be greater than 0", name);
    }

    if config.timeout_secs == 0 {
        bail!("{}.timeout_secs must be greater than 0", name);
    }

    if config.api_key.is_none() {
        warn!(backend = name, "No API key configured for text-generation backend");
    }

    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<()> {
    if config.coalesce_grace_secs > 300 {
        warn!(
            coalesce_grace_secs = config.coalesce_grace_secs,
            "cache.coalesce_grace_secs is long; completed requests stay pinned in memory"
        );
    }

    Ok(())
}
