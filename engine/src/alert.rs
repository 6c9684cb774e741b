use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use common::warn_if_slow;

use crate::bus::MessagePublisher;

/// Publishing slower than this is reported on the `performance` target.
const SLOW_PUBLISH: Duration = Duration::from_millis(250);

/// Payload emitted on the alert topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub symbol: String,
    pub interval: String,
    /// One detail line per rule, newline-separated, in rule order.
    pub indicators: String,
    /// Unix seconds at which the alert was produced.
    pub timestamp: i64,
}

impl AlertEvent {
    pub fn new(symbol: &str, interval: &str, details: &[String], timestamp: i64) -> Self {
        Self {
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            indicators: details.join("\n"),
            timestamp,
        }
    }
}

/// Serializes alerts onto the outbound topic. Failures are logged and dropped.
#[derive(Clone)]
pub struct AlertPublisher {
    sink: Arc<dyn MessagePublisher>,
}

impl AlertPublisher {
    pub fn new(sink: Arc<dyn MessagePublisher>) -> Self {
        Self { sink }
    }

    pub async fn publish(&self, alert: &AlertEvent) {
        let payload = match serde_json::to_vec(alert) {
            Ok(p) => p,
            Err(e) => {
                error!(symbol = %alert.symbol, error = %e, "alert serialization failed");
                return;
            }
        };

        match warn_if_slow("alert_publish", SLOW_PUBLISH, self.sink.publish(payload)).await {
            Ok(()) => debug!(symbol = %alert.symbol, interval = %alert.interval, "alert published"),
            Err(e) => error!(
                symbol = %alert.symbol,
                interval = %alert.interval,
                error = %e,
                "alert publish failed"
            ),
        }
    }
}
