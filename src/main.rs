mod config;
mod error;
mod handlers;
mod models;
mod server;
mod services;

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;

use config::Config;
use handlers::Analyzer;
use server::create_router;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before the logger so RUST_LOG from .env applies
    dotenv().ok();
    env_logger::init();

    log::info!("🚀 Starting meal analysis server...");

    let config = Arc::new(Config::from_env()?);
    let configured: Vec<&str> = [
        ("gemini", config.credentials.gemini.is_some()),
        ("openai", config.credentials.openai.is_some()),
        ("huggingface", config.credentials.huggingface.is_some()),
        ("custom", config.credentials.custom.is_some()),
    ]
    .iter()
    .filter(|(_, present)| *present)
    .map(|(name, _)| *name)
    .collect();
    if configured.is_empty() {
        log::warn!("⚠️ No provider API keys configured, requests default to anonymous HuggingFace");
    } else {
        log::info!("🔑 Default credentials configured for: {}", configured.join(", "));
    }

    let analyzer = Arc::new(Analyzer::new(config.clone())?);
    log::info!(
        "✅ Analyzer initialized (Gemini model: {}, fallback: {})",
        config.models.gemini_primary,
        config.models.gemini_fallback
    );

    let app = create_router(analyzer);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    log::info!("🌐 Server running on http://localhost:{}", config.port);
    log::info!("📁 Serving static files from {}", config.static_dir.display());

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("🛑 Shutting down...");
        })
        .await
        .context("Server error")?;

    Ok(())
}
