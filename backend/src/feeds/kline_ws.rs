use std::time::Duration;

use anyhow::Context;
use futures::StreamExt;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, trace, warn};

use engine::bus::TopicProducer;

pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Live kline feed: republishes every text frame of the combined stream onto
/// the data topic, reconnecting whenever the socket drops.
pub struct KlineWsFeed {
    url: String,
    reconnect_delay: Duration,
}

enum SessionEnd {
    Disconnected,
    Shutdown,
}

impl KlineWsFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Runs until shutdown. Fails only when the data topic is closed.
    #[instrument(skip_all, fields(url = %self.url))]
    pub async fn run(
        &self,
        data: TopicProducer,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        info!("kline feed started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            debug!("connecting to kline stream");
            match connect_async(self.url.as_str()).await {
                Ok((ws, _)) => {
                    info!("kline stream connected");
                    match self.pump(ws, &data, &mut shutdown).await? {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Disconnected => {}
                    }
                }
                Err(e) => error!(error = %e, "kline stream connection failed"),
            }

            warn!(delay = ?self.reconnect_delay, "kline stream disconnected; reconnecting");
            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = shutdown.changed() => {}
            }
        }

        info!("kline feed stopped");
        Ok(())
    }

    async fn pump<S>(
        &self,
        mut ws: S,
        data: &TopicProducer,
        shutdown: &mut watch::Receiver<bool>,
    ) -> anyhow::Result<SessionEnd>
    where
        S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            let next = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(SessionEnd::Shutdown);
                    }
                    continue;
                }
                msg = ws.next() => msg,
            };

            let msg = match next {
                Some(Ok(m)) => m,
                Some(Err(e)) => {
                    warn!(error = %e, "kline stream error");
                    return Ok(SessionEnd::Disconnected);
                }
                None => return Ok(SessionEnd::Disconnected),
            };

            match msg {
                Message::Text(text) => {
                    trace!(raw = %text.as_str(), "kline frame");
                    data.send(text.as_str().as_bytes().to_vec())
                        .await
                        .context("data topic closed")?;
                }
                Message::Close(frame) => {
                    debug!(?frame, "kline stream closed by peer");
                    return Ok(SessionEnd::Disconnected);
                }
                other => debug!(msg_type = ?other, "ignoring non-text frame"),
            }
        }
    }
}
