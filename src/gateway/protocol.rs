use crate::conversation::WireMessage;
use serde::{Deserialize, Serialize};

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequestBody {
    pub messages: Vec<WireMessage>,
}

/// Successful reply from `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponseBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

/// Failure reply from `POST /chat`, sent with a non-2xx status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime: u64,
}
