//! # Chat Delivery Server
//!
//! Entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Chat store and identity backends
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use chat_delivery::config::Settings;
use chat_delivery::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    chat_delivery::telemetry::init_tracing();

    info!("Starting chat delivery server...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        storage = ?settings.storage.backend,
        auth = ?settings.auth.strategy,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
