use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::info;

use engine::{BusError, MessagePublisher};

/// Writes each alert as one JSON line to `W` (stdout in the service).
pub struct LineAlertSink<W> {
    out: Mutex<W>,
}

impl<W> LineAlertSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W> MessagePublisher for LineAlertSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn publish(&self, mut payload: Vec<u8>) -> Result<(), BusError> {
        info!(alert = %String::from_utf8_lossy(&payload), "alert");

        payload.push(b'\n');
        let mut out = self.out.lock().await;
        out.write_all(&payload)
            .await
            .map_err(|e| BusError::Transport(e.to_string()))?;
        out.flush()
            .await
            .map_err(|e| BusError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn each_alert_is_one_line() {
        let sink = LineAlertSink::new(Vec::<u8>::new());

        sink.publish(br#"{"symbol":"BTCUSDT"}"#.to_vec()).await.unwrap();
        sink.publish(br#"{"symbol":"ETHUSDT"}"#.to_vec()).await.unwrap();

        let written = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(written, "{\"symbol\":\"BTCUSDT\"}\n{\"symbol\":\"ETHUSDT\"}\n");
    }
}
