mod config;
mod gemini;
mod generator;
mod models;
mod prompt;
mod routes;
mod store;

use anyhow::Context;
use routes::{router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::gemini::{ContentProvider, GeminiClient};
use crate::generator::BuildGenerator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    if config.api_key.is_none() {
        tracing::warn!("No API key found in API_KEY or GEMINI_API_KEY; generation requests will fail until one is set");
    }
    tracing::info!(base_url = %config.base_url, "Gemini configuration loaded");

    let provider: Arc<dyn ContentProvider> = Arc::new(GeminiClient::new(config.api_key.clone(), config.base_url.clone()));
    let generator = Arc::new(BuildGenerator::new(provider, config.model.clone()));
    tracing::info!("Builds will be generated with {}", generator.model());
    let state = AppState { store: Arc::default(), generator };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
