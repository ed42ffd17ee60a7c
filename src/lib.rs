//! Library root for `bot-launcher`.
//!
//! Bot-launcher brings a Slack bot online in a fixed order:
//! - Exposes a liveness endpoint before anything slow happens
//! - Initializes persistent storage
//! - Confirms the bot's identity with the chat API, retrying transient failures
//! - Attaches the event handlers and starts the receive loop
//!
//! The architecture is built around extensible traits so that the chat platform,
//! the storage backend, and the handlers can all be swapped out (and mocked).

#[deny(missing_docs)]
pub mod base;
pub mod connect;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, supervise, types::Void};
use rustls::crypto;
use service::health::HealthServer;
use tracing::{info, warn};

/// Public async entry for the binary crate.
///
/// Binds the health endpoint before anything else can fail, then creates the
/// runtime and runs the startup sequence until the receive loop stops.
pub async fn start(config: Config) -> Void {
    info!("Starting bot-launcher ...");

    // Route panics into the log.
    supervise::install_panic_hook();

    // Liveness first.
    let health = HealthServer::bind(config.health_port).await?;

    // Start the crypto provider.
    if crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed; keeping it.");
    }

    let runtime = runtime::Runtime::new(config);

    runtime.launch(health).await
}
