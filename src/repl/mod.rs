//! Terminal front end: an interactive loop and a one-shot `ask`.

use crate::client::{ChatTransport, DirectTransport, ProxyTransport};
use crate::config::Config;
use crate::exchange::{Exchange, ExchangeOutcome, UserInput};
use crate::media::resolve_limits;
use crate::providers::resolve_provider;
use crate::render;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

const GREETING: &str = "Start chatting (press Enter with no input to exit)";
const HELP: &str = "Commands: /image <path> attaches an image to your next message, \
                    /history shows the conversation, /help shows this text.";

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    Help,
    History,
    AttachImage(PathBuf),
    Message(String),
}

pub fn parse_line(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Quit;
    }
    match line.split_once(char::is_whitespace) {
        Some(("/image", path)) if !path.trim().is_empty() => {
            ReplCommand::AttachImage(PathBuf::from(path.trim()))
        }
        _ => match line {
            "/help" | "/image" => ReplCommand::Help,
            "/history" => ReplCommand::History,
            _ => ReplCommand::Message(line.to_string()),
        },
    }
}

/// Pick the transport: a proxy when one is configured, the upstream otherwise.
pub fn build_transport(config: &Config, proxy: Option<&str>) -> Result<Box<dyn ChatTransport>> {
    match proxy.or(config.client.proxy_url.as_deref()) {
        Some(url) => {
            info!("Using proxy at {}", url);
            Ok(Box::new(ProxyTransport::new(url)))
        }
        None => {
            let provider = resolve_provider(&config.upstream)?;
            info!("Talking to {} directly", config.upstream.base_url);
            Ok(Box::new(DirectTransport::new(provider)))
        }
    }
}

pub fn new_exchange(config: &Config) -> Exchange {
    let exchange = Exchange::new(config.deployment.clone(), resolve_limits(&config.media));
    match config.client.timeout_secs {
        Some(secs) => exchange.with_timeout(Duration::from_secs(secs)),
        None => exchange,
    }
}

async fn read_image(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image '{}'", path.display()))
}

/// Run the interactive loop on stdin/stdout.
pub async fn run_repl(config: &Config, proxy: Option<&str>) -> Result<()> {
    let transport = build_transport(config, proxy)?;
    let mut exchange = new_exchange(config);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    run_session(&mut exchange, transport.as_ref(), stdin, &mut stdout).await
}

/// Drive a conversation from `input` until an empty line or EOF.
pub async fn run_session<R, W>(
    exchange: &mut Exchange,
    transport: &dyn ChatTransport,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut attachment: Option<PathBuf> = None;

    out.write_all(format!("{GREETING}\n").as_bytes()).await?;

    loop {
        out.write_all(b"You: ").await?;
        out.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let text = match parse_line(&line) {
            ReplCommand::Quit => break,
            ReplCommand::Help => {
                out.write_all(format!("{HELP}\n").as_bytes()).await?;
                continue;
            }
            ReplCommand::History => {
                let transcript = render::transcript(exchange.log());
                out.write_all(format!("{transcript}\n").as_bytes()).await?;
                continue;
            }
            ReplCommand::AttachImage(path) => {
                out.write_all(format!("Attached {}\n", path.display()).as_bytes())
                    .await?;
                attachment = Some(path);
                continue;
            }
            ReplCommand::Message(text) => text,
        };

        let user_input = match attachment.take() {
            Some(path) => match read_image(&path).await {
                Ok(bytes) => UserInput::with_image(text, bytes),
                Err(e) => {
                    out.write_all(format!("Error: {e:#}\n").as_bytes()).await?;
                    continue;
                }
            },
            None => UserInput::text(text),
        };

        let reply = match exchange.submit(user_input, transport).await {
            ExchangeOutcome::Completed(reply) => {
                format!("Assistant: {}\n", render::to_terminal(&reply.message))
            }
            outcome => format!("Error: {}\n", outcome.notice().unwrap_or("request ignored")),
        };
        out.write_all(reply.as_bytes()).await?;
    }

    out.write_all(b"Goodbye!\n").await?;
    out.flush().await?;
    Ok(())
}

/// Send one message (optionally with an image) and print the answer.
pub async fn ask_once(
    config: &Config,
    proxy: Option<&str>,
    message: &str,
    image: Option<&Path>,
) -> Result<()> {
    let transport = build_transport(config, proxy)?;
    let mut exchange = new_exchange(config);

    let input = match image {
        Some(path) => UserInput::with_image(message, read_image(path).await?),
        None => UserInput::text(message),
    };

    match exchange.submit(input, transport.as_ref()).await {
        ExchangeOutcome::Completed(reply) => {
            println!("{}", render::to_terminal(&reply.message));
            Ok(())
        }
        ExchangeOutcome::Rejected { error, notice } | ExchangeOutcome::Failed { error, notice } => {
            anyhow::bail!("{notice} ({error})")
        }
        ExchangeOutcome::Ignored => anyhow::bail!("exchange already in flight"),
    }
}
