//! twcompare - Territory War guild comparison bot
//!
//! Serves the `/twcompare` chat command: verifies signed interactions,
//! aggregates both guilds from the data provider, and posts the
//! comparison back through the interaction webhook. Can also run one
//! comparison from the command line.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, bind failure, invalid key, etc.)
//!   2 - One-shot comparison could not be produced

mod analysis;
mod cli;
mod config;
mod interactions;
mod models;
mod provider;
mod report;

use analysis::{compare_guilds, ComparisonOutcome, GuildAggregator};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use interactions::{create_router, AppState, SignatureVerifier, WebhookSink};
use provider::{GuildDataSource, ProviderClient};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("twcompare v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let result = if args.is_one_shot() {
        run_compare(&args).await
    } else {
        run_server(&args).await.map(|_| 0)
    };

    match result {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("twcompare failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .twcompare.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".twcompare.toml");

    if path.exists() {
        eprintln!("⚠️  .twcompare.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .twcompare.toml")?;

    println!("✅ Created .twcompare.toml with default settings.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence when set.
fn init_logging(args: &Args) {
    let level = args.log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        Config::load(config_path)?
    } else {
        match Config::load_default() {
            Ok(Some(config)) => {
                info!("Loaded default config from .twcompare.toml");
                config
            }
            Ok(None) => {
                debug!("No config file found, using defaults");
                Config::default()
            }
            Err(e) => {
                warn!("Failed to load config: {:#}", e);
                Config::default()
            }
        }
    };

    config.merge_with_args(args);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Build the aggregator over the provider client.
fn build_aggregator(args: &Args, config: &Config) -> Result<GuildAggregator> {
    let access_key = args
        .provider_key
        .as_deref()
        .context("Provider access key is not set")?;

    let client = ProviderClient::new(config.provider_settings(access_key))
        .context("Failed to create provider HTTP client")?;
    let source: Arc<dyn GuildDataSource> = Arc::new(client);

    Ok(GuildAggregator::new(source, config.provider.concurrency))
}

/// Compare two guilds once and print the report. Returns exit code (0 or 2).
async fn run_compare(args: &Args) -> Result<i32> {
    let start_time = Instant::now();
    let config = load_config(args)?;
    let aggregator = build_aggregator(args, &config)?;

    let own = args.own_guild.as_deref().unwrap_or_default();
    let opponent = args.opponent_guild.as_deref().unwrap_or_default();

    info!("Comparing {} against {}", own, opponent);
    let outcome = compare_guilds(&aggregator, own, opponent).await;
    info!("Comparison finished in {:.1}s", start_time.elapsed().as_secs_f64());

    match outcome {
        ComparisonOutcome::Ready { own, opponent } => {
            let output = match args.format {
                OutputFormat::Text => report::render_comparison(&own, &opponent),
                OutputFormat::Json => report::generate_json_report(&own, &opponent)?,
            };
            println!("{}", output);
            Ok(0)
        }
        ComparisonOutcome::Failed(reasons) => {
            eprintln!("{}", report::render_failure(&reasons));
            Ok(2)
        }
    }
}

/// Serve the interaction endpoint until interrupted.
async fn run_server(args: &Args) -> Result<()> {
    let config = load_config(args)?;

    let public_key = args
        .public_key
        .as_deref()
        .context("Public key is not set")?;
    let verifier = SignatureVerifier::from_hex(public_key).context("Invalid public key")?;

    let sink = WebhookSink::new(
        config.delivery.api_base.clone(),
        config.delivery.timeout_seconds,
        config.delivery.max_message_len,
    )
    .context("Failed to create webhook HTTP client")?;

    let state = AppState {
        verifier: Arc::new(verifier),
        aggregator: build_aggregator(args, &config)?,
        sink: Arc::new(sink),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;

    info!("Listening on http://{}", config.server.bind);
    info!(
        "Provider: {} (timeout {}s, concurrency {})",
        config.provider.base_url, config.provider.timeout_seconds, config.provider.concurrency
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
