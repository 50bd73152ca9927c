mod campaign;
mod config;
mod error;
mod generator;
mod llm;
mod models;
mod routes;
mod social;
mod upload;

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    config::Config,
    generator::VariantGenerator,
    llm::OpenRouterClient,
    routes::{router, AppState},
    social::MockPoster,
    upload::UploadConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!(
        "Using API key: {}... (model {}, policy {:?})",
        config.api_key.chars().take(10).collect::<String>(),
        config.model,
        config.failure_policy
    );

    let provider = OpenRouterClient::new(config.api_key.clone(), config.api_base.clone(), config.model.clone());
    if provider.is_demo() {
        tracing::warn!("OPENROUTER_API_KEY not set; serving canned demo copy");
    }

    let generator = VariantGenerator::new(Arc::new(provider), config.provider_timeout, config.failure_policy);
    let poster = MockPoster::new(config.post_delay);
    let upload = UploadConfig {
        base_url: config.upload_base_url.clone(),
        max_bytes: config.max_upload_bytes,
    };
    let app = router(AppState::new(generator, poster, upload));

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
