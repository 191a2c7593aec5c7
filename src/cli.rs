//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// twcompare - compare two guilds for Territory War
///
/// Runs the interaction endpoint for the `/twcompare` chat command, or
/// compares two guilds once from the command line.
///
/// Examples:
///   twcompare
///   twcompare --bind 0.0.0.0:8080 --verbose
///   twcompare --own-guild abc123 --opponent-guild xyz789
///   twcompare --own-guild abc123 --opponent-guild xyz789 --format json
///   twcompare --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .twcompare.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Address the interaction endpoint listens on
    #[arg(long, value_name = "ADDR", env = "TWCOMPARE_BIND")]
    pub bind: Option<String>,

    /// Provider API root URL
    #[arg(long, value_name = "URL")]
    pub provider_url: Option<String>,

    /// Member detail fetches in flight per guild
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Provider request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Own guild id for a one-shot comparison
    #[arg(long, value_name = "GUILD", requires = "opponent_guild")]
    pub own_guild: Option<String>,

    /// Opponent guild id for a one-shot comparison
    #[arg(long, value_name = "GUILD", requires = "own_guild")]
    pub opponent_guild: Option<String>,

    /// Output format for one-shot comparisons (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Hex-encoded application public key used to verify interactions
    #[arg(long, env = "DISCORD_PUBLIC_KEY", hide_env_values = true)]
    pub public_key: Option<String>,

    /// Provider access key
    #[arg(long, env = "SWGOH_API_KEY", hide_env_values = true)]
    pub provider_key: Option<String>,

    /// Generate a default .twcompare.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for one-shot comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Chat message text (default)
    #[default]
    Text,
    /// JSON aggregate records
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// True when both guilds were given on the command line.
    pub fn is_one_shot(&self) -> bool {
        self.own_guild.is_some() && self.opponent_guild.is_some()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.own_guild.is_some() != self.opponent_guild.is_some() {
            return Err("--own-guild and --opponent-guild must be given together".to_string());
        }

        for guild in [&self.own_guild, &self.opponent_guild].into_iter().flatten() {
            if guild.trim().is_empty() {
                return Err("Guild ids must not be empty".to_string());
            }
        }

        if let Some(ref url) = self.provider_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Provider URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.provider_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err("Provider access key is required (--provider-key or SWGOH_API_KEY)".to_string());
        }

        if !self.is_one_shot() && self.public_key.is_none() {
            return Err(
                "Public key is required to serve interactions (--public-key or DISCORD_PUBLIC_KEY)"
                    .to_string(),
            );
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
