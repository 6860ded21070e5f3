// ==========================================
// Catalog import - server entry point
// ==========================================
// Environment:
// - CATALOG_IMPORT_DB_PATH: database file (default: user data dir)
// - CATALOG_IMPORT_ADDR: listen address (default: 127.0.0.1:8080)
// - CATALOG_IMPORT_LOCALE: message locale (default: ru)
// - RUST_LOG: log filter (default: info)
// ==========================================

use catalog_import::app::{get_default_db_path, router, AppState};
use catalog_import::{i18n, logging};
use tokio::net::TcpListener;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_LOCALE: &str = "ru";

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", catalog_import::APP_NAME, catalog_import::VERSION);
    tracing::info!("==================================================");

    i18n::set_locale(&env_or("CATALOG_IMPORT_LOCALE", DEFAULT_LOCALE));

    let db_path = get_default_db_path();
    tracing::info!(db_path = %db_path, "using database");
    let state = AppState::new(&db_path)?;

    let addr = env_or("CATALOG_IMPORT_ADDR", DEFAULT_ADDR);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
