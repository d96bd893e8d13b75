//! digiNORI API - Main Entry Point

use api::{init_logging, install_metrics, run_server, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load()?;
    init_logging(config.level()?)?;

    info!("=== digiNORI API v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Record store: {}", config.database_path.display());

    let metrics = install_metrics()?;
    run_server(config, Some(metrics)).await?;

    Ok(())
}
