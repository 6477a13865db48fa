mod defaults;
mod types;
mod validation;

pub use defaults::*;
pub use types::*;
pub use validation::*;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Maximum size for a config file (1 MB).
pub const MAX_CONFIG_FILE_BYTES: u64 = 1024 * 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub deployment: DeploymentProfile,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

impl Config {
    /// Load configuration from file, environment, and defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(find_config_file)
            .unwrap_or_else(|| PathBuf::from("grok-chat.json"));

        let mut config = if config_path.exists() {
            info!("Loading config from {}", config_path.display());
            load_config_file(&config_path)?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        validate_config_object(&config)?;

        Ok(config)
    }

    /// Write default configuration to a file.
    pub fn write_default(path: &str) -> Result<()> {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("GROK_CHAT_PORT") {
            if let Ok(port) = port.parse() {
                self.gateway.port = port;
            }
        }

        if let Ok(bind) = std::env::var("GROK_CHAT_BIND") {
            if let Ok(mode) = bind.parse() {
                self.gateway.bind = mode;
            }
        }

        if let Ok(key) = std::env::var("XAI_API_KEY") {
            if !key.is_empty() {
                self.upstream.api_key = Some(key);
            }
        }

        if let Ok(url) = std::env::var("BASE_URL") {
            if !url.is_empty() {
                self.upstream.base_url = url;
            }
        }

        if let Ok(url) = std::env::var("GROK_CHAT_PROXY_URL") {
            if !url.is_empty() {
                self.client.proxy_url = Some(url);
            }
        }
    }
}

/// Find the configuration file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let candidates = [
        PathBuf::from("grok-chat.json"),
        PathBuf::from("grok-chat.yaml"),
        PathBuf::from("grok-chat.yml"),
        PathBuf::from("grok-chat.toml"),
    ];

    for path in &candidates {
        if path.exists() {
            return Some(path.clone());
        }
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".grok-chat").join("config.json");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

/// Load configuration from a file path.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Cannot stat config file '{}'", path.display()))?;
    if metadata.len() > MAX_CONFIG_FILE_BYTES {
        bail!(
            "Config file '{}' is {} bytes, exceeds limit of {} bytes",
            path.display(),
            metadata.len(),
            MAX_CONFIG_FILE_BYTES,
        );
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        _ => {
            // JSON5 is a superset of JSON
            json5::from_str(&content)
                .with_context(|| format!("Invalid config file '{}'", path.display()))?
        }
    };

    Ok(config)
}
