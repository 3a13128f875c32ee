//! Tileboard server binary
//!
//! Reads `config.yaml` (optional) and `.env`, then serves the API.

use std::sync::Arc;
use tileboard_registry::ChartRegistry;
use tileboard_server::{logging, router, AppState, Config, DocumentStore, JsonDirProvider};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config_path = std::env::var("TILEBOARD_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load_or_default(&config_path)?;
    config.apply_logging_env();
    logging::init();

    let store = match &config.storage.directory {
        Some(dir) => DocumentStore::open(dir).await?,
        None => DocumentStore::in_memory(),
    };
    let registry = ChartRegistry::default();
    info!(
        data_dir = %config.data.data_dir,
        row_limit = config.data.row_limit,
        storage = ?config.storage.directory,
        charts = registry.charts().len(),
        "starting tileboard server"
    );

    let state = AppState {
        provider: Arc::new(JsonDirProvider::new(&config.data.data_dir)),
        store: Arc::new(store),
        registry: Arc::new(registry),
        row_limit: config.data.row_limit,
    };

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("tileboard server listening on {}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
