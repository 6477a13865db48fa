/// Default configuration constants used across the system.

/// Default proxy port.
pub const DEFAULT_GATEWAY_PORT: u16 = 8787;

/// Default upstream base URL (xAI's OpenAI-compatible API).
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.x.ai/v1";

/// Default upstream request timeout in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;

/// Default proxy URL used by `chat --proxy` when none is given.
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8787";

/// Default text-only model.
pub const DEFAULT_TEXT_MODEL: &str = "grok-beta";

/// Default image-capable model.
pub const DEFAULT_VISION_MODEL: &str = "grok-vision-beta";

/// Sampling temperature for text-only requests.
pub const DEFAULT_TEXT_TEMPERATURE: f64 = 0.7;

/// Sampling temperature for requests carrying an image.
pub const DEFAULT_VISION_TEMPERATURE: f64 = 0.01;

/// Maximum bare base64 length of an image forwarded upstream.
pub const DEFAULT_MAX_OUTBOUND_IMAGE_CHARS: usize = 50_000;

/// Maximum request body accepted by `POST /chat` (1 MB).
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Default system instruction for text-only deployments.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are Grok, a chatbot, a helpful assistant that can answer questions about anything.";

/// Default system instruction when image understanding is enabled.
pub const DEFAULT_VISION_SYSTEM_PROMPT: &str =
    "You are Grok, a helpful assistant that can answer questions about anything. \
     When the user shares an image, describe and analyze it carefully before answering.";
