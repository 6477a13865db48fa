use thiserror::Error;

/// Notice shown when an uploaded image cannot be ingested.
pub const IMAGE_FAILURE_NOTICE: &str = "Failed to process image.";

/// Notice shown when an exchange fails after it was submitted.
pub const SEND_FAILURE_NOTICE: &str = "Failed to send message. Please try again.";

/// Errors raised while ingesting input or performing a conversation exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error("input has neither text nor an image")]
    EmptyInput,

    /// Raw upload rejected before any decoding was attempted.
    #[error("image is {size} bytes, exceeds ingestion limit of {limit} bytes")]
    ImageTooLarge { size: usize, limit: usize },

    #[error("failed to decode image: {0}")]
    DecodeFailure(String),

    /// Normalized image is still too large to forward upstream.
    #[error("encoded image is {len} characters, exceeds outbound limit of {limit}")]
    PayloadTooLarge { len: usize, limit: usize },

    #[error("this deployment does not accept images")]
    ImagesUnsupported,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("chat endpoint returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ExchangeError {
    /// Whether this error happened while ingesting the image, before any
    /// exchange started.
    pub fn is_ingestion(&self) -> bool {
        matches!(
            self,
            ExchangeError::ImageTooLarge { .. } | ExchangeError::DecodeFailure(_)
        )
    }

    /// Generic message suitable for showing to the user. Diagnostic detail
    /// stays in the logs.
    pub fn user_notice(&self) -> &'static str {
        match self {
            ExchangeError::EmptyInput => "Type a message or attach an image.",
            e if e.is_ingestion() => IMAGE_FAILURE_NOTICE,
            _ => SEND_FAILURE_NOTICE,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ExchangeError::MalformedResponse(e.to_string())
        } else {
            ExchangeError::Transport(e.to_string())
        }
    }
}
