//! tether-relay: rendezvous relay pairing a host with one remote guest.
//!
//! Hosts open a session under a key of their choosing; a guest joins with a
//! passcode the host validates. Once paired, input and payload events are
//! forwarded between the two without inspection.

mod connection;
mod http;
mod hub;
mod protocol;
mod router;
mod session;

use std::path::PathBuf;

use clap::Parser;
use tether_common::TetherError;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::connection::accept_loop;
use crate::http::ProbeState;

#[derive(Parser)]
#[command(name = "tether-relay", version, about = "Pairing relay for remote-control sessions")]
struct Args {
    /// Config file path override.
    #[arg(long)]
    config: Option<PathBuf>,

    /// WebSocket port to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// HTTP probe port to listen on.
    #[arg(long)]
    http_port: Option<u16>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), TetherError> {
    let args = Args::parse();

    // Loaded before logging so the configured level applies; errors are
    // reported once the subscriber is up.
    let loaded = tether_config::load_config(args.config.as_deref());

    let level = loaded
        .as_ref()
        .map(|config| config.logging.level)
        .unwrap_or_default();
    let filter = match args.log_level.as_deref() {
        Some(cli_level) => EnvFilter::try_new(format!("tether_relay={cli_level}"))
            .unwrap_or_else(|_| EnvFilter::new(level.directive())),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.directive())),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) if args.config.is_some() => return Err(e.into()),
        Err(e) => {
            tracing::warn!("Config load failed, using defaults: {e}");
            tether_config::TetherConfig::default()
        }
    };
    if let Some(port) = args.port {
        config.server.ws_port = port;
    }
    if let Some(port) = args.http_port {
        config.server.http_port = port;
    }
    tether_config::validation::validate(&config)?;
    tracing::debug!("Resolved config:\n{}", tether_config::config_to_json(&config));

    tracing::info!("tether-relay v{} starting", env!("CARGO_PKG_VERSION"));

    let hub = hub::spawn(config.pairing.join_timeout());

    let ws_listener = TcpListener::bind(config.server.ws_addr()).await?;
    tracing::info!("WebSocket relay listening on {}", config.server.ws_addr());

    let http_listener = TcpListener::bind(config.server.http_addr()).await?;
    tracing::info!("HTTP probes listening on {}", config.server.http_addr());

    let probes = ProbeState {
        hub: hub.clone(),
        session_delay: config.probes.session_delay(),
    };
    tokio::spawn(async move {
        if let Err(e) = http::serve(http_listener, probes).await {
            tracing::error!(error = %e, "HTTP probe server stopped");
        }
    });

    let outbound_buffer = config.pairing.outbound_buffer as usize;
    tokio::select! {
        _ = accept_loop(ws_listener, hub, outbound_buffer) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            }
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
