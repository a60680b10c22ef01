use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use starmap_config::RuntimeConfig;
use std::path::PathBuf;

/// Group a GitHub user's starred repositories into categories
#[derive(Parser)]
#[command(name = "starmap")]
#[command(version)]
#[command(about = "Group a GitHub user's starred repositories into categories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// HTTP listen port (overrides config file)
    #[arg(short, long, value_name = "PORT", global = true)]
    port: Option<u16>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default if no subcommand given)
    Serve,
    /// Categorize one user's stars and print the result as JSON
    Categorize {
        /// GitHub username
        subject: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    // Step 1: Load base configuration
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load().context("Failed to load configuration")?
    };

    // Step 2: Apply CLI overrides (highest priority)
    apply_cli_overrides(&mut config, &cli);

    // Step 3: Initialize tracing before validating so its warnings show up
    // Note: run_with_config will also call init_tracing, but that's idempotent
    starmap::init_tracing(&config);
    config.validate()?;

    match cli.command {
        Some(Commands::Categorize { subject }) => {
            let outcome = starmap::categorize_once(&config, &subject).await?;
            let json =
                serde_json::to_string_pretty(&outcome).context("Failed to serialize result")?;
            println!("{}", json);
            Ok(())
        }
        Some(Commands::Serve) | None => {
            display_startup_info(&config);
            starmap::run_with_config(config).await
        }
    }
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) {
    if let Some(port) = cli.port {
        config.server.listen_addr = format!("0.0.0.0:{}", port);
    }

    if let Some(level) = &cli.log_level {
        config.server.log_level = level.clone();
    }
}

fn display_startup_info(config: &RuntimeConfig) {
    use tracing::info;

    info!("╭─────────────────────────────────────────────────");
    info!("│ starmap v{}", env!("CARGO_PKG_VERSION"));
    info!("├─────────────────────────────────────────────────");
    info!("│ Listen address: http://{}", config.server.listen_addr);
    info!("│ GitHub API: {}", config.upstream.api_base);
    info!(
        "│ GitHub token: {}",
        if config.upstream.token.is_some() {
            "configured"
        } else {
            "none (60 requests/hour)"
        }
    );
    info!(
        "│ Pagination: {} per page, {} pages per wave, max {} pages",
        config.upstream.page_size, config.upstream.wave_width, config.upstream.max_pages
    );
    info!(
        "│ Primary model: {} ({}s timeout)",
        config.primary.model, config.primary.timeout_secs
    );
    info!(
        "│ Fallback model: {} ({}s timeout)",
        config.fallback.model, config.fallback.timeout_secs
    );
    info!(
        "│ Cache TTL: stars {}s, categories {}s",
        config.cache.stars_ttl_secs, config.cache.categories_ttl_secs
    );
    info!("│ Log level: {}", config.server.log_level);
    info!("╰─────────────────────────────────────────────────");
}
