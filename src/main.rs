use std::net::SocketAddr;

use anyhow::Context;
use payrelay_backend::api::{create_router, AppState};
use payrelay_backend::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    init_tracing();

    // Load configuration
    let config = Config::from_env()?;

    // Log startup info
    tracing::info!("Starting payrelay backend");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!(
        "QPay gateway: {}",
        if config.qpay.gateway_url.is_empty() {
            "not configured"
        } else {
            config.qpay.gateway_url.as_str()
        }
    );
    tracing::info!("CyberSource gateway: {}", config.cybersource.payment_url);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("HOST and PORT must form a valid socket address")?;

    // Build router
    let state = AppState::new(config).context("Failed to initialize payment gateways")?;
    let app = create_router(state);

    // Start server
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
