use super::{BackendConfig, LogFormat, RuntimeConfig};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "STARMAP_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the STARMAP_ prefix
    /// Used for conventional variables (GITHUB_TOKEN, OPENAI_API_KEY)
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Server configuration (listen addr, log level/format)
    if let Some(addr) = get_env_string(env, "LISTEN_ADDR") {
        config.server.listen_addr = addr;
    }
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.server.log_level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        config.server.log_format = format
            .parse::<LogFormat>()
            .context("Invalid STARMAP_LOG_FORMAT value")?;
    }

    // Upstream
    if let Some(base) = get_env_string(env, "GITHUB_API_BASE") {
        config.upstream.api_base = base;
    }
    // Prefixed token wins over the conventional GITHUB_TOKEN
    if let Some(token) = get_env_string(env, "GITHUB_TOKEN").or_else(|| env.get_raw("GITHUB_TOKEN"))
    {
        if !token.is_empty() {
            config.upstream.token = Some(token);
        }
    }
    if let Some(val) = get_env_parsed::<_, u32>(env, "PAGE_SIZE")? {
        config.upstream.page_size = val;
    }
    if let Some(val) = get_env_parsed::<_, usize>(env, "WAVE_WIDTH")? {
        config.upstream.wave_width = val;
    }
    if let Some(val) = get_env_parsed::<_, u32>(env, "MAX_PAGES")? {
        config.upstream.max_pages = val;
    }
    if let Some(val) = get_env_parsed::<_, u64>(env, "UPSTREAM_TIMEOUT_SECS")? {
        config.upstream.timeout_secs = val;
    }

    // Text-generation backends
    apply_backend_overrides(&mut config.primary, env, "PRIMARY_")?;
    apply_backend_overrides(&mut config.fallback, env, "FALLBACK_")?;

    // OPENAI_API_KEY fills any backend that has no key of its own
    if let Some(key) = env.get_raw("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
        for backend in [&mut config.primary, &mut config.fallback] {
            if backend.api_key.is_none() {
                backend.api_key = Some(key.clone());
            }
        }
    }

    // Cache lifetimes
    if let Some(val) = get_env_parsed::<_, u64>(env, "STARS_TTL_SECS")? {
        config.cache.stars_ttl_secs = val;
    }
    if let Some(val) = get_env_parsed::<_, u64>(env, "CATEGORIES_TTL_SECS")? {
        config.cache.categories_ttl_secs = val;
    }
    if let Some(val) = get_env_parsed::<_, u64>(env, "COALESCE_GRACE_SECS")? {
        config.cache.coalesce_grace_secs = val;
    }

    Ok(())
}

fn apply_backend_overrides<E: EnvSource>(
    backend: &mut BackendConfig,
    env: &E,
    prefix: &str,
) -> Result<()> {
    let key = |name: &str| format!("{}{}", prefix, name);

    if let Some(base) = get_env_string(env, &key("API_BASE")) {
        backend.api_base = base;
    }
    if let Some(api_key) = get_env_string(env, &key("API_KEY")) {
        if !api_key.is_empty() {
            backend.api_key = Some(api_key);
        }
    }
    if let Some(model) = get_env_string(env, &key("MODEL")) {
        backend.model = model;
    }
    if let Some(val) = get_env_parsed::<_, f32>(env, &key("TEMPERATURE"))? {
        backend.temperature = val;
    }
    if let Some(val) = get_env_parsed::<_, u32>(env, &key("MAX_TOKENS"))? {
        backend.max_tokens = val;
    }
    if let Some(val) = get_env_parsed::<_, u64>(env, &key("TIMEOUT_SECS"))? {
        backend.timeout_secs = val;
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
}

fn get_env_parsed<E, T>(env: &E, key: &str) -> Result<Option<T>>
where
    E: EnvSource,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
