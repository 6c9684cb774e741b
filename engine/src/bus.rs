//! Message-bus seams for the two consumption loops and the alert topic.
//!
//! The engine only depends on these traits. `topic()` provides an in-process
//! implementation with Kafka-like offsets and a committed-offset watermark.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::error::BusError;

/// Pause before fetching again after a transport error.
pub const FETCH_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub offset: u64,
    pub payload: Vec<u8>,
}

#[async_trait]
pub trait MessageSource: Send {
    /// Waits for the next message. `BusError::Closed` ends consumption.
    async fn fetch(&mut self) -> Result<Delivery, BusError>;

    /// Acknowledges everything up to and including `offset`.
    async fn commit(&mut self, offset: u64) -> Result<(), BusError>;
}

#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), BusError>;
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles one payload. Failures are logged by the handler itself.
    async fn handle(&self, payload: &[u8]);
}

/// Creates an in-process topic of the given capacity.
pub fn topic(name: &str, capacity: usize) -> (TopicProducer, TopicConsumer) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let committed = Arc::new(AtomicU64::new(0));

    (
        TopicProducer {
            name: name.to_string(),
            tx,
            next_offset: Arc::new(AtomicU64::new(0)),
        },
        TopicConsumer {
            name: name.to_string(),
            rx,
            committed: CommitWatermark(committed),
        },
    )
}

#[derive(Clone)]
pub struct TopicProducer {
    name: String,
    tx: mpsc::Sender<Delivery>,
    next_offset: Arc<AtomicU64>,
}

impl TopicProducer {
    /// Appends `payload`, waiting for room when the topic is full.
    pub async fn send(&self, payload: Vec<u8>) -> Result<u64, BusError> {
        let offset = self.next_offset.fetch_add(1, Ordering::Relaxed);
        self.tx
            .send(Delivery { offset, payload })
            .await
            .map_err(|_| BusError::Closed(self.name.clone()))?;
        Ok(offset)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl MessagePublisher for TopicProducer {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), BusError> {
        self.send(payload).await.map(|_| ())
    }
}

/// Next offset the consumer group would resume from (last commit + 1).
#[derive(Clone, Debug, Default)]
pub struct CommitWatermark(Arc<AtomicU64>);

impl CommitWatermark {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

pub struct TopicConsumer {
    name: String,
    rx: mpsc::Receiver<Delivery>,
    committed: CommitWatermark,
}

impl TopicConsumer {
    pub fn watermark(&self) -> CommitWatermark {
        self.committed.clone()
    }
}

#[async_trait]
impl MessageSource for TopicConsumer {
    async fn fetch(&mut self) -> Result<Delivery, BusError> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| BusError::Closed(self.name.clone()))
    }

    async fn commit(&mut self, offset: u64) -> Result<(), BusError> {
        self.committed.0.fetch_max(offset + 1, Ordering::AcqRel);
        Ok(())
    }
}

/// Fetch, handle, commit, until shutdown or the source closes.
///
/// The commit happens only after the handler returns (at-least-once). Shutdown
/// is observed between messages, so a message being handled always finishes.
pub async fn run_consumer<S, H>(
    name: &'static str,
    mut source: S,
    handler: Arc<H>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: MessageSource,
    H: MessageHandler + ?Sized,
{
    info!(consumer = name, "consumption loop started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let fetched = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            res = source.fetch() => res,
        };

        match fetched {
            Ok(delivery) => {
                handler.handle(&delivery.payload).await;

                if let Err(e) = source.commit(delivery.offset).await {
                    warn!(
                        consumer = name,
                        offset = delivery.offset,
                        error = %e,
                        "offset commit failed"
                    );
                } else {
                    debug!(consumer = name, offset = delivery.offset, "offset committed");
                }
            }
            Err(BusError::Closed(topic)) => {
                warn!(consumer = name, topic = %topic, "source closed");
                break;
            }
            Err(e) => {
                error!(consumer = name, error = %e, "fetch failed; retrying");
                tokio::time::sleep(FETCH_RETRY_DELAY).await;
            }
        }
    }

    info!(consumer = name, "consumption loop stopped");
}
