use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, info, trace, warn};

use common::child_span;
use market::KlineEvent;

use crate::alert::{AlertEvent, AlertPublisher};
use crate::bus::MessageHandler;
use crate::config::AggregationPolicy;
use crate::previous::{PreviousKey, PreviousValueStore};
use crate::registry::{BarOutcome, JobRegistry, WindowSnapshot};
use crate::rule::RuleOutcome;

/// Per-event window update, rule fan-out, aggregation and alerting.
pub struct DataPlaneHandler {
    registry: Arc<JobRegistry>,
    previous: Arc<PreviousValueStore>,
    publisher: AlertPublisher,
    aggregation: AggregationPolicy,
    permits: Arc<Semaphore>,
}

impl DataPlaneHandler {
    pub fn new(
        registry: Arc<JobRegistry>,
        previous: Arc<PreviousValueStore>,
        publisher: AlertPublisher,
        aggregation: AggregationPolicy,
        max_inflight_evaluations: usize,
    ) -> Self {
        Self {
            registry,
            previous,
            publisher,
            aggregation,
            permits: Arc::new(Semaphore::new(max_inflight_evaluations.max(1))),
        }
    }

    /// Runs one event through the pipeline and returns the alert it produced, if any.
    pub async fn process_event(&self, event: KlineEvent) -> Option<AlertEvent> {
        let key = event.key();

        let snapshot = match self.registry.apply_bar(&key, &event.symbol, event.bar) {
            BarOutcome::Updated(snapshot) => snapshot,
            BarOutcome::NoJob => {
                trace!(key = %key, "no job for key");
                return None;
            }
            BarOutcome::NoWindow => {
                debug!(key = %key, "instrument was not seeded; ignoring");
                return None;
            }
            BarOutcome::Unchanged(update) => {
                debug!(key = %key, ?update, "window unchanged; skipping evaluation");
                return None;
            }
        };

        let outcomes = self.fan_out(&snapshot).await;
        let met: Vec<bool> = outcomes.iter().map(|o| o.met).collect();

        if !self.aggregation.triggered(&met) {
            return None;
        }

        let details: Vec<String> = outcomes.into_iter().map(|o| o.detail).collect();
        let alert = AlertEvent::new(
            &snapshot.symbol,
            snapshot.interval.as_str(),
            &details,
            Utc::now().timestamp(),
        );

        info!(symbol = %alert.symbol, interval = %alert.interval, "alert conditions met");
        self.publisher.publish(&alert).await;
        Some(alert)
    }

    /// One task per rule, bounded by the shared permit pool, joined in rule order.
    async fn fan_out(&self, snapshot: &WindowSnapshot) -> Vec<RuleOutcome> {
        let closes: Arc<[f64]> = Arc::from(snapshot.closes.as_slice());

        let tasks = snapshot.rules.iter().enumerate().map(|(slot, _)| {
            let rules = Arc::clone(&snapshot.rules);
            let closes = Arc::clone(&closes);
            let previous = Arc::clone(&self.previous);
            let permits = Arc::clone(&self.permits);
            let key = PreviousKey {
                generation: snapshot.generation,
                symbol: snapshot.symbol.clone(),
                slot,
            };
            let span = child_span("rule_evaluation");
            span.record("symbol", snapshot.symbol.as_str());

            tokio::spawn(
                async move {
                    let rule = &rules[slot];
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return RuleOutcome::failed(&rule.name, "evaluation pool closed");
                    };

                    let value = rule.compute(&closes);
                    let prev = previous.swap(key, value);
                    rule.evaluate(value, prev)
                }
                .instrument(span),
            )
        });

        let joined = join_all(tasks).await;

        joined
            .into_iter()
            .zip(snapshot.rules.iter())
            .map(|(res, rule)| match res {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(rule = %rule.name, error = %e, "rule task failed");
                    RuleOutcome::failed(&rule.name, e)
                }
            })
            .collect()
    }
}

#[async_trait]
impl MessageHandler for DataPlaneHandler {
    async fn handle(&self, payload: &[u8]) {
        match KlineEvent::from_json(payload) {
            Ok(event) => {
                self.process_event(event).await;
            }
            Err(e) => warn!(error = %e, "malformed kline event dropped"),
        }
    }
}
