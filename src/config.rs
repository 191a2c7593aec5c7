//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.twcompare.toml` files. Credentials never live in the file; they
//! come from the command line or the environment.

use crate::analysis::DEFAULT_CONCURRENCY;
use crate::interactions::delivery::DEFAULT_MAX_MESSAGE_LEN;
use crate::provider::ProviderSettings;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_CONFIG_FILE: &str = ".twcompare.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Interaction endpoint settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Data provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Result delivery settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Interaction endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// Data provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API root URL.
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    /// Header carrying the access key.
    #[serde(default = "default_access_header")]
    pub access_header: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,

    /// Member detail fetches in flight per guild.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            access_header: default_access_header(),
            timeout_seconds: default_provider_timeout(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_provider_url() -> String {
    "https://swgoh.gg/api".to_string()
}

fn default_access_header() -> String {
    "x-gg-bot-access".to_string()
}

fn default_provider_timeout() -> u64 {
    15
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

/// Result delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Chat API root used for webhook edits.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Webhook request timeout in seconds.
    #[serde(default = "default_delivery_timeout")]
    pub timeout_seconds: u64,

    /// Longer messages are truncated.
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout_seconds: default_delivery_timeout(),
            max_message_len: default_max_message_len(),
        }
    }
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_delivery_timeout() -> u64 {
    10
}

fn default_max_message_len() -> usize {
    DEFAULT_MAX_MESSAGE_LEN
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.twcompare.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref bind) = args.bind {
            self.server.bind = bind.clone();
        }
        if let Some(ref url) = args.provider_url {
            self.provider.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.provider.timeout_seconds = timeout;
        }
        if let Some(concurrency) = args.concurrency {
            self.provider.concurrency = concurrency;
        }
    }

    /// Reject settings that cannot work at runtime.
    ///
    /// Applies to the merged configuration, so file values get the same
    /// checks as command-line flags.
    pub fn validate(&self) -> Result<()> {
        if !is_http_url(&self.provider.base_url) {
            bail!(
                "provider.base_url must start with 'http://' or 'https://', got '{}'",
                self.provider.base_url
            );
        }
        if self.provider.timeout_seconds == 0 {
            bail!("provider.timeout_seconds must be at least 1");
        }
        if self.provider.concurrency == 0 {
            bail!("provider.concurrency must be at least 1");
        }
        if !is_http_url(&self.delivery.api_base) {
            bail!(
                "delivery.api_base must start with 'http://' or 'https://', got '{}'",
                self.delivery.api_base
            );
        }
        if self.delivery.timeout_seconds == 0 {
            bail!("delivery.timeout_seconds must be at least 1");
        }
        if self.delivery.max_message_len == 0 {
            bail!("delivery.max_message_len must be at least 1");
        }
        Ok(())
    }

    /// Provider client settings using the given access key.
    pub fn provider_settings(&self, access_key: &str) -> ProviderSettings {
        ProviderSettings {
            base_url: self.provider.base_url.clone(),
            access_header: self.provider.access_header.clone(),
            access_key: access_key.to_string(),
            timeout_seconds: self.provider.timeout_seconds,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
