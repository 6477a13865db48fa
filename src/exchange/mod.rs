//! Optimistic exchange state machine.
//!
//! A submit appends the user's turn plus a pending assistant placeholder,
//! then performs a single request. Success swaps the placeholder for the
//! answer; any failure removes the placeholder and keeps the user's turn so
//! it can be resent. At most one exchange is in flight per conversation.

use crate::client::{ChatReply, ChatTransport};
use crate::config::DeploymentProfile;
use crate::conversation::{ConversationLog, Turn};
use crate::error::ExchangeError;
use crate::media::{self, ImageLimits};
use crate::request::{OutboundRequest, RequestBuilder};

use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Submitting,
}

/// Raw user input: text plus an optional image as uploaded.
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    pub text: String,
    pub image: Option<Vec<u8>>,
}

impl UserInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub fn with_image(text: impl Into<String>, image: Vec<u8>) -> Self {
        Self {
            text: text.into(),
            image: Some(image),
        }
    }
}

/// What a submit ended in.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    /// Another exchange was in flight; nothing changed.
    Ignored,
    /// The input was rejected before the conversation was touched.
    Rejected {
        error: ExchangeError,
        notice: &'static str,
    },
    Completed(ChatReply),
    /// The exchange failed and the placeholder was rolled back.
    Failed {
        error: ExchangeError,
        notice: &'static str,
    },
}

impl ExchangeOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExchangeOutcome::Completed(_))
    }

    /// User-facing failure notice, if any.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            ExchangeOutcome::Rejected { notice, .. } | ExchangeOutcome::Failed { notice, .. } => {
                Some(*notice)
            }
            _ => None,
        }
    }
}

/// A started exchange. Holds the built request, or the builder's error when
/// the request must not be sent.
#[derive(Debug)]
#[must_use = "a started exchange must be completed"]
pub struct InFlight {
    pub request: Result<OutboundRequest, ExchangeError>,
}

pub struct Exchange {
    log: ConversationLog,
    state: ExchangeState,
    builder: RequestBuilder,
    limits: ImageLimits,
    timeout: Option<Duration>,
}

impl Exchange {
    pub fn new(profile: DeploymentProfile, limits: ImageLimits) -> Self {
        let log = ConversationLog::new(profile.active_system_prompt());
        Self {
            log,
            state: ExchangeState::Idle,
            builder: RequestBuilder::new(profile),
            limits,
            timeout: None,
        }
    }

    /// Bound each transport call. Expiry is reported as a transport failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn is_submitting(&self) -> bool {
        self.state == ExchangeState::Submitting
    }

    /// Turn raw input into a user turn, normalizing any attached image.
    pub fn prepare(&self, input: UserInput) -> Result<Turn, ExchangeError> {
        let text = input.text.trim().to_string();
        match input.image {
            Some(raw) => {
                let image = media::normalize(&raw, &self.limits)?;
                Ok(Turn::user_with_image(text, image.data_url()))
            }
            None if text.is_empty() => Err(ExchangeError::EmptyInput),
            None => Ok(Turn::user(text)),
        }
    }

    /// `Idle -> Submitting`. Returns `None` if an exchange is already in
    /// flight or the turn is empty; the log is untouched in that case.
    pub fn begin(&mut self, turn: Turn) -> Option<InFlight> {
        if self.is_submitting() {
            debug!("Submit ignored: exchange already in flight");
            return None;
        }
        if turn.is_empty() {
            return None;
        }

        self.log.push(turn);
        self.log.push(Turn::pending());
        self.state = ExchangeState::Submitting;

        let request = self.builder.build(self.log.turns());
        Some(InFlight { request })
    }

    /// `Submitting -> Idle`, reconciling the log with the result.
    /// Without an exchange in flight this is a no-op returning `Ignored`.
    pub fn complete(&mut self, result: Result<ChatReply, ExchangeError>) -> ExchangeOutcome {
        if !self.is_submitting() {
            debug!("Completion ignored: no exchange in flight");
            return ExchangeOutcome::Ignored;
        }
        self.state = ExchangeState::Idle;

        match result {
            Ok(reply) => {
                self.log.replace_pending(Turn::assistant(reply.message.clone()));
                info!(
                    "Exchange completed ({} turns, fingerprint={})",
                    self.log.len(),
                    reply.system_fingerprint.as_deref().unwrap_or("-")
                );
                ExchangeOutcome::Completed(reply)
            }
            Err(error) => {
                self.log.remove_pending();
                warn!("Exchange failed, rolled back pending turn: {}", error);
                ExchangeOutcome::Failed {
                    notice: error.user_notice(),
                    error,
                }
            }
        }
    }

    /// Run one full exchange: prepare, begin, send, complete.
    pub async fn submit<T>(&mut self, input: UserInput, transport: &T) -> ExchangeOutcome
    where
        T: ChatTransport + ?Sized,
    {
        if self.is_submitting() {
            return ExchangeOutcome::Ignored;
        }

        let turn = match self.prepare(input) {
            Ok(turn) => turn,
            Err(error) => {
                warn!("Rejected input: {}", error);
                return ExchangeOutcome::Rejected {
                    notice: error.user_notice(),
                    error,
                };
            }
        };

        let Some(in_flight) = self.begin(turn) else {
            return ExchangeOutcome::Ignored;
        };

        let result = match in_flight.request {
            Ok(request) => self.send(transport, &request).await,
            Err(error) => Err(error),
        };

        self.complete(result)
    }

    async fn send<T>(&self, transport: &T, request: &OutboundRequest) -> Result<ChatReply, ExchangeError>
    where
        T: ChatTransport + ?Sized,
    {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, transport.send(request))
                .await
                .map_err(|_| ExchangeError::Transport(format!("no response within {limit:?}")))?,
            None => transport.send(request).await,
        }
    }
}
