//! Client for OpenAI-compatible chat completion APIs.
//!
//! xAI, OpenAI, Groq and most local servers accept the same
//! `/chat/completions` request shape.

use super::{ModelProvider, ProviderError, ProviderRequest, ProviderResponse};
use crate::conversation::WireMessage;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

// ============================================================================
// OpenAI-Compatible API Types
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [WireMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiResponse {
    pub choices: Vec<OpenAiChoice>,
    pub system_fingerprint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiChoice {
    pub message: OpenAiMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiMessage {
    pub content: Option<serde_json::Value>,
}

// ============================================================================
// Shared Functions
// ============================================================================

/// Build an OpenAI-compatible request body. Streaming is never requested.
pub(crate) fn build_request(request: &ProviderRequest) -> OpenAiRequest<'_> {
    OpenAiRequest {
        model: &request.model,
        messages: &request.messages,
        temperature: request.temperature,
        stream: false,
    }
}

/// Parse an OpenAI-compatible response into our ProviderResponse.
pub(crate) fn parse_response(
    api_resp: OpenAiResponse,
    provider_name: &str,
) -> Result<ProviderResponse, ProviderError> {
    let invalid = |reason: &str| ProviderError::InvalidResponse {
        provider: provider_name.to_string(),
        reason: reason.to_string(),
    };

    let choice = api_resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| invalid("no choices in response"))?;

    let content = match choice.message.content {
        Some(serde_json::Value::String(text)) => text,
        // Some servers echo content back as text parts.
        Some(serde_json::Value::Array(parts)) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join(""),
        _ => return Err(invalid("choice has no message content")),
    };

    Ok(ProviderResponse {
        content,
        system_fingerprint: api_resp.system_fingerprint,
        finish_reason: choice.finish_reason,
    })
}

// ============================================================================
// Provider
// ============================================================================

pub struct OpenAiCompatProvider {
    name: String,
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.into(),
            api_key,
            base_url,
            client,
        })
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatProvider {
    async fn chat(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let body = build_request(&request);
        debug!(
            "{} chat request: model={}, {} messages",
            self.name,
            body.model,
            body.messages.len()
        );

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                provider: self.name.clone(),
                source,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: self.name.clone(),
                status,
                body: text,
            });
        }

        let api_resp: OpenAiResponse =
            resp.json().await.map_err(|e| ProviderError::InvalidResponse {
                provider: self.name.clone(),
                reason: e.to_string(),
            })?;

        parse_response(api_resp, &self.name)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
