use clap::Parser;
use grok_chat::cli::{Cli, Commands, ConfigAction};
use grok_chat::config::Config;
use grok_chat::gateway::GatewayServer;
use grok_chat::{logging, repl};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(opts) => {
            info!("Starting grok-chat proxy server");
            let config = Config::load(opts.config.as_deref())?;
            let server = GatewayServer::start(config, opts).await?;
            server.run_until_shutdown().await?;
        }
        Commands::Chat(opts) => {
            let config = Config::load(opts.config.as_deref())?;
            repl::run_repl(&config, opts.proxy.as_deref()).await?;
        }
        Commands::Ask(opts) => {
            let config = Config::load(opts.config.as_deref())?;
            repl::ask_once(
                &config,
                opts.proxy.as_deref(),
                &opts.message,
                opts.image.as_deref(),
            )
            .await?;
        }
        Commands::Config(opts) => match opts.action {
            ConfigAction::Show => {
                let mut config = Config::load(opts.config.as_deref())?;
                if config.upstream.api_key.is_some() {
                    config.upstream.api_key = Some("********".to_string());
                }
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Validate => {
                Config::load(opts.config.as_deref())?;
                info!("Configuration is valid");
            }
            ConfigAction::Init => {
                Config::write_default(opts.config.as_deref().unwrap_or("grok-chat.json"))?;
                info!("Configuration file created");
            }
        },
        Commands::Version => {
            println!("grok-chat {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
