//! Streaming indicator alert engine.
//!
//! Two consumption loops share one [`JobRegistry`]: the control plane installs
//! jobs from registration requests, the data plane applies kline events to
//! their windows, evaluates every rule concurrently and publishes alerts.

pub mod alert;
pub mod bus;
pub mod config;
pub mod control;
pub mod error;
pub mod indicators;
pub mod job;
pub mod operator;
pub mod pipeline;
pub mod previous;
pub mod registry;
pub mod rule;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use market::ExchangeApi;

pub use alert::{AlertEvent, AlertPublisher};
pub use bus::{Delivery, MessageHandler, MessagePublisher, MessageSource, run_consumer, topic};
pub use config::{AggregationPolicy, EngineConfig};
pub use control::{ControlHandler, ControlRequest, Registration};
pub use error::{BusError, ControlError};
pub use indicators::{Indicator, IndicatorError, IndicatorLibrary};
pub use operator::{EvalError, Operator};
pub use pipeline::DataPlaneHandler;
pub use previous::PreviousValueStore;
pub use registry::JobRegistry;

/// Wires the shared stores to both handlers.
pub struct Engine {
    registry: Arc<JobRegistry>,
    previous: Arc<PreviousValueStore>,
    control: Arc<ControlHandler>,
    data: Arc<DataPlaneHandler>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        exchange: Arc<dyn ExchangeApi>,
        alerts: Arc<dyn MessagePublisher>,
    ) -> Self {
        Self::with_library(config, exchange, alerts, IndicatorLibrary::default())
    }

    pub fn with_library(
        config: EngineConfig,
        exchange: Arc<dyn ExchangeApi>,
        alerts: Arc<dyn MessagePublisher>,
        library: IndicatorLibrary,
    ) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let previous = Arc::new(PreviousValueStore::new());

        let data = DataPlaneHandler::new(
            Arc::clone(&registry),
            Arc::clone(&previous),
            AlertPublisher::new(alerts),
            config.aggregation,
            config.max_inflight_evaluations,
        );
        let control = ControlHandler::new(
            Arc::clone(&registry),
            Arc::clone(&previous),
            exchange,
            Arc::new(library),
            config,
        );

        Self {
            registry,
            previous,
            control: Arc::new(control),
            data: Arc::new(data),
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn previous(&self) -> &PreviousValueStore {
        &self.previous
    }

    pub fn control(&self) -> &ControlHandler {
        &self.control
    }

    pub fn data(&self) -> &DataPlaneHandler {
        &self.data
    }

    /// Spawns the control and data consumption loops. Both stop when
    /// `shutdown` flips to `true` or their source closes.
    pub fn run<C, D>(
        &self,
        control_source: C,
        data_source: D,
        shutdown: watch::Receiver<bool>,
    ) -> (JoinHandle<()>, JoinHandle<()>)
    where
        C: MessageSource + 'static,
        D: MessageSource + 'static,
    {
        let control = tokio::spawn(run_consumer(
            "control",
            control_source,
            Arc::clone(&self.control),
            shutdown.clone(),
        ));
        let data = tokio::spawn(run_consumer(
            "data",
            data_source,
            Arc::clone(&self.data),
            shutdown,
        ));
        (control, data)
    }
}
