//! Transports that carry an [`OutboundRequest`] to a model and bring back the
//! assistant's answer.

use crate::error::ExchangeError;
use crate::gateway::{ChatRequestBody, ChatResponseBody, ErrorBody};
use crate::providers::{ModelProvider, ProviderError, ProviderRequest};
use crate::request::OutboundRequest;

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

/// The assistant's answer to one exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub message: String,
    pub system_fingerprint: Option<String>,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<ChatReply, ExchangeError>;
}

// ============================================================================
// Proxy Transport
// ============================================================================

/// Talks to a `grok-chat serve` instance over `POST /chat`.
///
/// Only the messages travel; the proxy does its own model routing.
pub struct ProxyTransport {
    client: Client,
    endpoint: String,
}

impl ProxyTransport {
    /// `base_url` is the proxy root, e.g. `http://127.0.0.1:8787`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for ProxyTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<ChatReply, ExchangeError> {
        debug!("POST {} ({} messages)", self.endpoint, request.messages.len());

        let body = ChatRequestBody {
            messages: request.messages.clone(),
        };
        let resp = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(ExchangeError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let reply: ChatResponseBody = serde_json::from_str(&text)
            .map_err(|e| ExchangeError::MalformedResponse(e.to_string()))?;

        Ok(ChatReply {
            message: reply.message,
            system_fingerprint: reply.system_fingerprint,
        })
    }
}

// ============================================================================
// Direct Transport
// ============================================================================

/// Calls the upstream provider in-process, using the builder's routing.
pub struct DirectTransport {
    provider: Arc<dyn ModelProvider>,
}

impl DirectTransport {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }
}

impl From<ProviderError> for ExchangeError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Request { .. } => ExchangeError::Transport(e.to_string()),
            ProviderError::Status { status, body, .. } => ExchangeError::Status {
                status,
                message: body,
            },
            ProviderError::InvalidResponse { .. } => {
                ExchangeError::MalformedResponse(e.to_string())
            }
        }
    }
}

#[async_trait]
impl ChatTransport for DirectTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<ChatReply, ExchangeError> {
        let response = self
            .provider
            .chat(ProviderRequest {
                model: request.model.clone(),
                messages: request.messages.clone(),
                temperature: Some(request.temperature),
            })
            .await?;

        Ok(ChatReply {
            message: response.content,
            system_fingerprint: response.system_fingerprint,
        })
    }
}
