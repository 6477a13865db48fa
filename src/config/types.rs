use super::defaults::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// Gateway Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayBindMode {
    #[default]
    Loopback,
    Lan,
    Custom,
}

impl std::str::FromStr for GatewayBindMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loopback" => Ok(Self::Loopback),
            "lan" => Ok(Self::Lan),
            "custom" => Ok(Self::Custom),
            _ => Err(format!("invalid bind mode: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub bind: GatewayBindMode,
    pub custom_bind_host: Option<String>,
    /// Directory with a browser UI, served for any path the API doesn't claim.
    pub static_root: Option<String>,
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_GATEWAY_PORT,
            bind: GatewayBindMode::default(),
            custom_bind_host: None,
            static_root: None,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

// ============================================================================
// Upstream Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
        }
    }
}

// ============================================================================
// Deployment Profile
// ============================================================================

/// Per-deployment capabilities and routing used by the request builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentProfile {
    #[serde(default = "default_true")]
    pub supports_images: bool,
    #[serde(default = "default_max_outbound_image_chars")]
    pub max_outbound_image_chars: usize,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_vision_system_prompt")]
    pub vision_system_prompt: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    #[serde(default = "default_text_temperature")]
    pub text_temperature: f64,
    #[serde(default = "default_vision_temperature")]
    pub vision_temperature: f64,
}

impl DeploymentProfile {
    /// The system instruction sent with every request.
    pub fn active_system_prompt(&self) -> &str {
        if self.supports_images {
            &self.vision_system_prompt
        } else {
            &self.system_prompt
        }
    }
}

impl Default for DeploymentProfile {
    fn default() -> Self {
        Self {
            supports_images: true,
            max_outbound_image_chars: DEFAULT_MAX_OUTBOUND_IMAGE_CHARS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            vision_system_prompt: DEFAULT_VISION_SYSTEM_PROMPT.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            text_temperature: DEFAULT_TEXT_TEMPERATURE,
            vision_temperature: DEFAULT_VISION_TEMPERATURE,
        }
    }
}

// ============================================================================
// Media / Client Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MediaConfig {
    pub max_dimension_px: Option<u32>,
    pub max_upload_bytes: Option<usize>,
    pub jpeg_quality: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// When set, the REPL talks to this proxy instead of the upstream.
    pub proxy_url: Option<String>,
    /// Bound on a single exchange; unset means wait indefinitely.
    pub timeout_secs: Option<u64>,
}

// ============================================================================
// Serde default helpers
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    DEFAULT_GATEWAY_PORT
}

fn default_max_request_bytes() -> usize {
    DEFAULT_MAX_REQUEST_BYTES
}

fn default_base_url() -> String {
    DEFAULT_UPSTREAM_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_SECS
}

fn default_max_outbound_image_chars() -> usize {
    DEFAULT_MAX_OUTBOUND_IMAGE_CHARS
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_vision_system_prompt() -> String {
    DEFAULT_VISION_SYSTEM_PROMPT.to_string()
}

fn default_text_model() -> String {
    DEFAULT_TEXT_MODEL.to_string()
}

fn default_vision_model() -> String {
    DEFAULT_VISION_MODEL.to_string()
}

fn default_text_temperature() -> f64 {
    DEFAULT_TEXT_TEMPERATURE
}

fn default_vision_temperature() -> f64 {
    DEFAULT_VISION_TEMPERATURE
}
