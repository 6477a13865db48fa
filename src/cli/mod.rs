use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "grok-chat", version, about = "Multimodal chat client and proxy")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the `POST /chat` proxy server.
    Serve(ServeOpts),
    /// Interactive chat in the terminal.
    Chat(ChatOpts),
    /// Send a single message and print the answer.
    Ask(AskOpts),
    Config(ConfigOpts),
    Version,
}

#[derive(clap::Args)]
pub struct ServeOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    #[arg(short, long)]
    pub port: Option<u16>,
    #[arg(short, long)]
    pub bind: Option<String>,
}

#[derive(clap::Args)]
pub struct ChatOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    /// Talk to a running proxy instead of the upstream API.
    #[arg(long, env = "GROK_CHAT_PROXY_URL")]
    pub proxy: Option<String>,
}

#[derive(clap::Args)]
pub struct AskOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    #[arg(long, env = "GROK_CHAT_PROXY_URL")]
    pub proxy: Option<String>,
    /// Attach an image file.
    #[arg(short, long)]
    pub image: Option<PathBuf>,
    #[arg(default_value = "")]
    pub message: String,
}

#[derive(clap::Args)]
pub struct ConfigOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    Show,
    Validate,
    Init,
}
