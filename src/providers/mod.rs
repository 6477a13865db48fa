pub(crate) mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use crate::config::UpstreamConfig;
use crate::conversation::WireMessage;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Provider Types
// ============================================================================

/// A request to a model provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub temperature: Option<f64>,
}

/// A response from a model provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub content: String,
    pub system_fingerprint: Option<String>,
    pub finish_reason: Option<String>,
}

/// Failure talking to the upstream provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {source}")]
    Request {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} API error ({status}): {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("{provider} returned an unusable response: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

// ============================================================================
// Provider Trait
// ============================================================================

#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn chat(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
    fn name(&self) -> &str;
}

// ============================================================================
// Provider Resolution
// ============================================================================

/// Build the upstream provider from configuration. Any OpenAI-compatible
/// endpoint works; the reference deployment uses xAI.
pub fn resolve_provider(config: &UpstreamConfig) -> Result<Arc<dyn ModelProvider>> {
    let api_key = config
        .api_key
        .clone()
        .or_else(|| std::env::var("XAI_API_KEY").ok())
        .ok_or_else(|| anyhow::anyhow!("No upstream API key configured (set XAI_API_KEY)"))?;

    let provider = OpenAiCompatProvider::new(
        "xai",
        api_key,
        config.base_url.trim_end_matches('/').to_string(),
        Duration::from_secs(config.timeout_secs),
    )?;

    Ok(Arc::new(provider))
}
