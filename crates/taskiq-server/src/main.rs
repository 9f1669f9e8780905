//! taskiq-server - HTTP Server Entry Point

use taskiq_server::{api, config::Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskiq_server=debug,taskiq_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        addr = %config.bind_addr(),
        origins = ?config.allowed_origins(),
        "Loaded configuration"
    );

    api::serve(config).await
}
