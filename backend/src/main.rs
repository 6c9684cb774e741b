use futures::future::join_all;
use tokio::sync::watch;

use backend::{app, config::AppConfig};
use common::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env();
    init_tracing("alertd", cfg.is_production());

    tracing::info!("Starting alertd...");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let service = app::start(&cfg, shutdown_rx).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    app::signal_shutdown(&shutdown_tx);
    join_all(service.tasks).await;
    tracing::info!(jobs = service.engine.registry().len(), "alertd stopped");

    Ok(())
}
