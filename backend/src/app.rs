use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use engine::{Engine, MessagePublisher, topic};
use market::ExchangeApi;
use market::exchange::BinanceFuturesClient;

use crate::config::AppConfig;
use crate::feeds::{KlineWsFeed, LineAlertSink, discover_streams, run_control_intake};

/// Handles of every long-running task of the service.
pub struct Service {
    pub engine: Engine,
    pub tasks: Vec<JoinHandle<()>>,
}

/// Tells every loop to stop. Returns false when none was listening.
pub fn signal_shutdown(tx: &watch::Sender<bool>) -> bool {
    match tx.send(true) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "shutdown signal had no listeners");
            false
        }
    }
}

/// Explicit `KLINE_STREAMS` win; otherwise the feed covers this process's
/// group of every instrument a wildcard registration could install.
pub async fn feed_streams(
    cfg: &AppConfig,
    exchange: &dyn ExchangeApi,
) -> anyhow::Result<Vec<String>> {
    if let Some(streams) = &cfg.kline_streams {
        return Ok(streams.clone());
    }

    let streams = discover_streams(
        exchange,
        &cfg.reference_quote,
        cfg.kline_interval,
        cfg.symbol_group,
        cfg.total_groups,
    )
    .await?;

    if streams.is_empty() {
        anyhow::bail!(
            "no {} instruments to subscribe in group {}/{}",
            cfg.reference_quote,
            cfg.symbol_group,
            cfg.total_groups
        );
    }
    Ok(streams)
}

/// Wires the exchange client, topics, adapters and engine loops together.
pub async fn start(cfg: &AppConfig, shutdown: watch::Receiver<bool>) -> anyhow::Result<Service> {
    let exchange: Arc<dyn ExchangeApi> = Arc::new(
        BinanceFuturesClient::new(cfg.exchange_rest_url.clone())
            .context("building exchange client")?,
    );
    let streams = feed_streams(cfg, exchange.as_ref()).await?;
    let alerts: Arc<dyn MessagePublisher> = Arc::new(LineAlertSink::new(tokio::io::stdout()));

    let engine = Engine::new(cfg.engine_config(), exchange, alerts);

    let (control_tx, control_rx) = topic("control", cfg.topic_capacity);
    let (data_tx, data_rx) = topic("data", cfg.topic_capacity);

    let (control_loop, data_loop) = engine.run(control_rx, data_rx, shutdown.clone());
    let mut tasks = vec![control_loop, data_loop];

    let feed = KlineWsFeed::new(cfg.stream_url(&streams));
    let feed_shutdown = shutdown.clone();
    tasks.push(tokio::spawn(async move {
        if let Err(e) = feed.run(data_tx, feed_shutdown).await {
            error!(error = ?e, "kline feed stopped");
        }
    }));

    tasks.push(tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        if let Err(e) = run_control_intake(stdin, control_tx, shutdown).await {
            error!(error = ?e, "control intake stopped");
        }
    }));

    info!(
        streams = streams.len(),
        aggregation = %cfg.aggregation,
        seed_limit = cfg.seed_limit,
        "alert service started"
    );

    Ok(Service { engine, tasks })
}
