mod log;

pub use log::*;

use serde::{Deserialize, Serialize};

/// Content of the assistant placeholder shown while a reply is outstanding.
pub const PENDING_SENTINEL: &str = "🤔 Thinking...";

/// Prompt substituted when an image is sent without any text.
pub const IMAGE_FALLBACK_PROMPT: &str = "What's in this image?";

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    #[default]
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default)]
    pub detail: ImageDetail,
}

/// A typed part of a multimodal message: `{type:"text"}` or `{type:"image_url"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Message content: either a plain string or an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Content {
    /// The textual content; text parts are joined by newlines.
    pub fn text(&self) -> String {
        match self {
            Content::Text(s) => s.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Image URLs carried by this content, in order.
    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        let parts: &[ContentPart] = match self {
            Content::Text(_) => &[],
            Content::Parts(parts) => parts,
        };
        parts.iter().filter_map(|p| match p {
            ContentPart::ImageUrl { image_url } => Some(image_url.url.as_str()),
            ContentPart::Text { .. } => None,
        })
    }

    pub fn has_image(&self) -> bool {
        self.image_urls().next().is_some()
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Content::Text(s.to_string())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Content::Text(s)
    }
}

/// A message as it travels over `POST /chat` and to the upstream provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: Content,
}

// ============================================================================
// Turn
// ============================================================================

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: Content,
    image: Option<String>,
    pending: bool,
}

impl Turn {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(text.into()),
            image: None,
            pending: false,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(text.into()),
            image: None,
            pending: false,
        }
    }

    /// A user turn carrying an image, given as a data URL or bare base64.
    pub fn user_with_image(text: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(text.into()),
            image: Some(image.into()),
            pending: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(text.into()),
            image: None,
            pending: false,
        }
    }

    /// The placeholder shown while a reply is outstanding. Only this
    /// constructor marks a turn pending; an answer with the same text is not.
    pub fn pending() -> Self {
        Self {
            pending: true,
            ..Self::assistant(PENDING_SENTINEL)
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn text(&self) -> String {
        self.content.text()
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether the turn carries neither text nor an image.
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.text().trim().is_empty()
    }

    /// Role and text only, as historical turns are forwarded. An image turn
    /// without text keeps the default image question so content is never empty.
    pub fn to_history_message(&self) -> WireMessage {
        let text = match self.image {
            Some(_) => text_or_image_prompt(self.text()),
            None => self.text(),
        };
        WireMessage {
            role: self.role,
            content: Content::Text(text),
        }
    }
}

// ============================================================================
// Outbound Shaping
// ============================================================================

/// Remove a leading `data:<mime>;base64,` marker, if any.
pub fn strip_data_url_prefix(image: &str) -> &str {
    if !image.starts_with("data:") {
        return image;
    }
    match image.find(";base64,") {
        Some(idx) => &image[idx + ";base64,".len()..],
        None => image,
    }
}

/// Build an image data URL from either a data URL or a bare JPEG payload.
pub fn to_data_url(image: &str) -> String {
    if image.starts_with("data:") {
        image.to_string()
    } else {
        format!("data:{};base64,{}", mime::IMAGE_JPEG, image)
    }
}

/// Text to send alongside an image: the user's words, or the default
/// question when there are none.
pub(crate) fn text_or_image_prompt(text: String) -> String {
    if text.trim().is_empty() {
        IMAGE_FALLBACK_PROMPT.to_string()
    } else {
        text
    }
}

/// Shape a turn's content for the wire. Text-only turns pass through; image
/// turns become `[image_url, text]`.
pub fn as_outbound_content(turn: &Turn) -> Content {
    let Some(image) = turn.image() else {
        return turn.content.clone();
    };

    let text = text_or_image_prompt(turn.text());

    Content::Parts(vec![
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: to_data_url(image),
                detail: ImageDetail::High,
            },
        },
        ContentPart::Text { text },
    ])
}
