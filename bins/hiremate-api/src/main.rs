mod handlers;
mod metrics;
mod routes;

use anyhow::Context;
use axum::Router;
use hiremate_common::catalog::ProblemCatalog;
use hiremate_common::config::ExecutorConfig;
use hiremate_executor::Executor;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub struct AppState {
    pub executor: Arc<Executor>,
    pub catalog: Arc<ProblemCatalog>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("HireMate API booting...");

    let config = ExecutorConfig::load_default().context("Failed to load executor configuration")?;
    info!(
        timeout_ms = config.timeout_ms,
        timeout_policy = ?config.timeout_policy,
        backend = ?config.backend,
        max_concurrent_runs = config.max_concurrent_runs,
        "Executor configuration loaded"
    );

    let catalog_path = std::env::var("HIREMATE_CATALOG")
        .unwrap_or_else(|_| "config/problems.json".to_string());
    let catalog = ProblemCatalog::load_from_file(&catalog_path)
        .with_context(|| format!("Failed to load problem catalog from {}", catalog_path))?;
    info!(problems = catalog.len(), path = %catalog_path, "Problem catalog loaded");

    metrics::register_metrics().context("Failed to register metrics")?;

    let state = Arc::new(AppState {
        executor: Arc::new(Executor::from_config(config)),
        catalog: Arc::new(catalog),
    });

    // Build router
    let app = Router::new().merge(routes::routes()).with_state(state);

    // Start server
    let addr = std::env::var("HIREMATE_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
