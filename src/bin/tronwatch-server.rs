#![forbid(unsafe_code)]
//! HTTP server: proxies TronGrid account lookups and records every one of them.

use std::sync::Arc;
use tronwatch::api::{run_api_server, AppState};
use tronwatch::config::load_config;
use tronwatch::persistence::Database;
use tronwatch::tron::TronClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tronwatch::init_tracing();

    let config = load_config()?;
    tracing::info!(
        database = %config.database_path,
        upstream = %config.api_url,
        port = config.port,
        "Starting tronwatch"
    );

    let history = Database::open(&config.database_path)?;
    let tron = TronClient::new(&config.api_url, &config.api_key)?;
    let state = AppState::new(Arc::new(history), tron);

    run_api_server(state, config.port).await?;

    Ok(())
}
