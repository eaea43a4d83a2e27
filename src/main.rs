//! wsroute server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser                         ┌────────────────────────────────────────────┐
//!     ───────────────────────────────▶│  http::server (axum)                       │
//!       POST /login, /register        │    ├─ auth ──▶ session::accounts ──┐       │
//!       GET  /, /static/*             │    ├─ base page / ServeDir         │       │
//!       GET  /ws (upgrade)            │    └─ websocket                    ▼       │
//!                                     │         │                       store      │
//!     "request" frame ───────────────▶│         ▼                          ▲       │
//!                                     │  dispatch::Dispatcher              │       │
//!                                     │    routing (added → declared)      │       │
//!                                     │    tier → $n fields → DataLoader ──┘       │
//!     "response" frame ◀──────────────│    render (minijinja) → OutboundReply      │
//!                                     └────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use wsroute::config::{load_config, AppConfig};
use wsroute::lifecycle::{shutdown_signal, Shutdown};
use wsroute::observability::{init_logging, metrics};
use wsroute::App;

#[derive(Parser)]
#[command(name = "wsroute")]
#[command(about = "WebSocket request dispatch server", long_about = None)]
struct Cli {
    /// Path to the config file (TOML, or JSON with a .json extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "wsroute starting");

    if config.session.secret == wsroute::config::SessionConfig::default().secret {
        tracing::warn!("Session secret is the built-in placeholder; set session.secret");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        routes = config.routes.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signaled = shutdown.signaled();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    App::new(config)?.serve(listener, signaled).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
