//! Multimodal chat pipeline around OpenAI-compatible completion APIs.
//!
//! Input flows through [`media`] (image normalization), [`conversation`]
//! (turns and wire shapes), [`request`] (outbound shaping and routing) and
//! [`exchange`] (the optimistic submit/reconcile state machine). The
//! [`gateway`] exposes the same pipeline as a `POST /chat` proxy.

pub mod cli;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod exchange;
pub mod gateway;
pub mod logging;
pub mod media;
pub mod providers;
pub mod render;
pub mod repl;
pub mod request;

pub use error::ExchangeError;
