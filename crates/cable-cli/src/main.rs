//! # Cable CLI
//!
//! Subscribes to one channel, prints every message pushed on it, and performs
//! an action for each line typed on stdin.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings (or ./cable.toml if present)
//! cable
//!
//! # Run with a custom config
//! cable /path/to/cable.toml
//!
//! # Run with environment variables
//! CABLE_URL=ws://localhost:3001/cable CABLE_CHANNEL=MeshRelayChannel cable
//! ```

mod config;
mod metrics;
mod session;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries received messages
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cable_cli=info,cable_client=info,cable_transport=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => config::Config::from_file(path)?,
        None => config::Config::load()?,
    };

    let identifier = config.channel_identifier()?;
    tracing::info!(
        "Connecting to {} on channel {}",
        config.client.url,
        identifier
    );

    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            tracing::error!("Failed to start metrics server: {}", e);
        }
    }

    session::run(config).await
}
