use crate::cli::ServeOpts;
use crate::config::{Config, GatewayBindMode};
use crate::gateway::routes;
use crate::providers::{resolve_provider, ModelProvider};
use crate::request::RequestBuilder;

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Shared state for the proxy server. Everything here is immutable; requests
/// share no conversation state.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub builder: Arc<RequestBuilder>,
    pub provider: Arc<dyn ModelProvider>,
    pub start_time: std::time::Instant,
    pub version: String,
}

impl GatewayState {
    pub fn new(config: Config, provider: Arc<dyn ModelProvider>) -> Self {
        let builder = RequestBuilder::new(config.deployment.clone());
        Self {
            config: Arc::new(config),
            builder: Arc::new(builder),
            provider,
            start_time: std::time::Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// The proxy server.
pub struct GatewayServer {
    state: GatewayState,
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
}

impl GatewayServer {
    /// Prepare the server with the given configuration.
    pub async fn start(config: Config, opts: ServeOpts) -> Result<Self> {
        let port = opts.port.unwrap_or(config.gateway.port);
        let bind_addr = resolve_bind_address(&config, opts.bind.as_deref(), port)?;

        let provider = resolve_provider(&config.upstream)?;
        info!(
            "Upstream provider '{}' at {}",
            provider.name(),
            config.upstream.base_url
        );

        let (shutdown_tx, _) = broadcast::channel(1);
        let state = GatewayState::new(config, provider);

        info!("Gateway server binding to {}", bind_addr);

        Ok(Self {
            state,
            addr: bind_addr,
            shutdown_tx,
        })
    }

    /// Run the server until shutdown signal is received.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let app = build_router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;
        print_startup_banner(&self.state, &self.addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(self.shutdown_tx.clone()))
            .await?;

        info!("Gateway server shut down gracefully");
        Ok(())
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Trigger graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

fn build_router(state: GatewayState) -> Router {
    routes::build_routes(state)
}

/// Wait for shutdown signal (Ctrl+C, SIGTERM or an explicit shutdown).
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let mut explicit = shutdown_tx.subscribe();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
        _ = explicit.recv() => {
            info!("Shutdown requested");
        }
    }
}

/// Resolve the bind address from configuration.
fn resolve_bind_address(
    config: &Config,
    bind_override: Option<&str>,
    port: u16,
) -> Result<SocketAddr> {
    let bind = match bind_override {
        Some(b) => b.parse().map_err(anyhow::Error::msg)?,
        None => config.gateway.bind,
    };

    let host = match bind {
        GatewayBindMode::Loopback => "127.0.0.1",
        GatewayBindMode::Lan => "0.0.0.0",
        GatewayBindMode::Custom => config
            .gateway
            .custom_bind_host
            .as_deref()
            .unwrap_or("0.0.0.0"),
    };

    format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid bind address {host}:{port}"))
}

fn print_startup_banner(state: &GatewayState, addr: &SocketAddr) {
    let profile = state.builder.profile();
    info!("-------------------------------------------");
    info!("  grok-chat proxy v{}", state.version);
    info!("  Listening on: http://{}", addr);
    info!("  Chat: POST http://{}/chat", addr);
    info!("  Health: http://{}/api/health", addr);
    info!(
        "  Models: text={} vision={}",
        profile.text_model,
        if profile.supports_images {
            profile.vision_model.as_str()
        } else {
            "disabled"
        }
    );
    if let Some(ref root) = state.config.gateway.static_root {
        info!("  UI: {}", root);
    }
    info!("-------------------------------------------");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_modes_resolve_hosts() {
        let mut config = Config::default();
        assert_eq!(
            resolve_bind_address(&config, None, 8787).unwrap(),
            "127.0.0.1:8787".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            resolve_bind_address(&config, Some("lan"), 80).unwrap(),
            "0.0.0.0:80".parse::<SocketAddr>().unwrap()
        );

        config.gateway.bind = GatewayBindMode::Custom;
        config.gateway.custom_bind_host = Some("10.0.0.5".into());
        assert_eq!(
            resolve_bind_address(&config, None, 9000).unwrap(),
            "10.0.0.5:9000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn unknown_bind_override_is_an_error() {
        assert!(resolve_bind_address(&Config::default(), Some("moon"), 1).is_err());
    }
}
