//! Shapes a conversation into the message list sent to the completion API.
//!
//! The builder owns three decisions: which system instruction leads the
//! request, how the newest turn is encoded (plain text or `[image, text]`),
//! and which model/temperature the request is routed to. Oversized images are
//! rejected here, before anything touches the network.

use crate::config::DeploymentProfile;
use crate::conversation::{
    as_outbound_content, strip_data_url_prefix, text_or_image_prompt, Content, Role, Turn,
    WireMessage,
};
use crate::error::ExchangeError;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A request ready for transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub model: String,
    pub temperature: f64,
    pub messages: Vec<WireMessage>,
}

impl OutboundRequest {
    /// Whether the newest message carries an image.
    pub fn has_image(&self) -> bool {
        self.messages
            .last()
            .is_some_and(|m| m.content.has_image())
    }
}

/// Model and temperature chosen for a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub model: String,
    pub temperature: f64,
}

#[derive(Debug, Clone)]
pub struct RequestBuilder {
    profile: DeploymentProfile,
}

impl RequestBuilder {
    pub fn new(profile: DeploymentProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &DeploymentProfile {
        &self.profile
    }

    /// Build the outbound request from conversation turns.
    ///
    /// System turns and pending placeholders in `turns` are skipped; the last
    /// remaining turn is treated as the newest one.
    pub fn build(&self, turns: &[Turn]) -> Result<OutboundRequest, ExchangeError> {
        let conversational: Vec<&Turn> = turns
            .iter()
            .filter(|t| t.role() != Role::System && !t.is_pending())
            .collect();

        let (newest, history) = conversational
            .split_last()
            .ok_or(ExchangeError::EmptyInput)?;

        if let Some(image) = newest.image() {
            self.check_image(image)?;
        }

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(self.system_message());
        messages.extend(history.iter().map(|t| t.to_history_message()));
        messages.push(WireMessage {
            role: newest.role(),
            content: as_outbound_content(newest),
        });

        let route = self.route(newest.image().is_some());
        debug!(
            "Built request: {} messages, model={}, temperature={}",
            messages.len(),
            route.model,
            route.temperature
        );

        Ok(OutboundRequest {
            model: route.model,
            temperature: route.temperature,
            messages,
        })
    }

    /// Re-derive routing for messages that were already shaped by a client.
    ///
    /// Any system message the client sent is replaced by this deployment's
    /// instruction, and the newest message's images go through the same size
    /// check `build` applies.
    pub fn route_wire(&self, messages: Vec<WireMessage>) -> Result<OutboundRequest, ExchangeError> {
        let mut messages: Vec<WireMessage> = messages
            .into_iter()
            .filter(|m| m.role != Role::System)
            .collect();

        let newest = messages.last().ok_or(ExchangeError::EmptyInput)?;
        for url in newest.content.image_urls() {
            self.check_image(url)?;
        }
        let has_image = newest.content.has_image();

        // Only the newest message may carry images upstream.
        let last = messages.len() - 1;
        for m in &mut messages[..last] {
            if m.content.has_image() {
                m.content = Content::Text(text_or_image_prompt(m.content.text()));
            }
        }

        messages.insert(0, self.system_message());
        let route = self.route(has_image);

        Ok(OutboundRequest {
            model: route.model,
            temperature: route.temperature,
            messages,
        })
    }

    /// Model and temperature for a request with or without an image.
    pub fn route(&self, has_image: bool) -> Route {
        if has_image {
            Route {
                model: self.profile.vision_model.clone(),
                temperature: self.profile.vision_temperature,
            }
        } else {
            Route {
                model: self.profile.text_model.clone(),
                temperature: self.profile.text_temperature,
            }
        }
    }

    fn system_message(&self) -> WireMessage {
        WireMessage {
            role: Role::System,
            content: Content::Text(self.profile.active_system_prompt().to_string()),
        }
    }

    fn check_image(&self, image: &str) -> Result<(), ExchangeError> {
        if !self.profile.supports_images {
            return Err(ExchangeError::ImagesUnsupported);
        }
        let len = strip_data_url_prefix(image).len();
        let limit = self.profile.max_outbound_image_chars;
        if len > limit {
            return Err(ExchangeError::PayloadTooLarge { len, limit });
        }
        Ok(())
    }
}
