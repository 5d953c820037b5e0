use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use inventory_manager::config;
use inventory_manager::database::{DatabaseManager, MemoryRepository, PgRepository, ResourceRepository};
use inventory_manager::routes::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting Inventory Manager API in {:?} mode", config.environment);

    let repository: Arc<dyn ResourceRepository> = if DatabaseManager::is_configured() {
        let pool = DatabaseManager::main_pool().await.context("failed to connect to DATABASE_URL")?;
        Arc::new(PgRepository::new(pool))
    } else {
        tracing::warn!("DATABASE_URL not set, serving the in-memory demo data set");
        Arc::new(MemoryRepository::demo())
    };

    // Allow tests or deployments to override port via env
    let port = std::env::var("INVENTORY_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Inventory Manager API listening on http://{}", bind_addr);

    axum::serve(listener, app(AppState::new(repository)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;

    DatabaseManager::close_all().await;
    Ok(())
}
