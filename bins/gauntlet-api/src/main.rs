mod handlers;
mod metrics;
mod routes;

use anyhow::{Context, Result};
use axum::Router;
use chrono::{DateTime, Utc};
use gauntlet_common::Config;
use gauntlet_engine::{ExecutionCache, Executor, LanguageConfigManager, PistonEngine};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::info;

pub struct AppState {
    pub executor: Arc<Executor>,
    pub runtimes: Arc<LanguageConfigManager>,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Gauntlet API booting...");

    metrics::init_metrics();
    info!("Metrics registry initialized");

    let config = Config::from_env();
    info!(
        sandbox = %config.sandbox_url,
        entry_point = ?config.entry_point,
        "Configuration loaded"
    );

    let runtimes = LanguageConfigManager::load_or_default(Path::new(&config.languages_config_path))
        .context("Failed to load language configuration")?;

    let enabled_langs: Vec<String> = runtimes
        .enabled_languages()
        .iter()
        .map(|l| l.to_string())
        .collect();
    info!("Enabled languages = {:?}", enabled_langs);

    let engine = PistonEngine::new(&config, runtimes.clone())?;
    let cache = ExecutionCache::in_memory(config.single_cache_ttl(), config.batch_cache_ttl());
    let executor = Executor::new(Arc::new(engine), cache, config.entry_point);

    let state = Arc::new(AppState {
        executor: Arc::new(executor),
        runtimes: Arc::new(runtimes),
        start_time: Instant::now(),
        started_at: Utc::now(),
    });

    let app = Router::new().merge(routes::routes()).with_state(state);

    let listener = TcpListener::bind(&config.api_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.api_addr))?;

    info!("HTTP server listening on {}", config.api_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
