use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::{debug, info};

use engine::bus::TopicProducer;

/// Forwards newline-delimited registration messages onto the control topic
/// until end of input or shutdown. Blank lines are skipped.
pub async fn run_control_intake<R>(
    reader: R,
    control: TopicProducer,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            _ = shutdown.changed() => break,
            line = lines.next_line() => line.context("reading control input")?,
        };

        let Some(line) = line else {
            info!("control input closed");
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let offset = control
            .send(line.as_bytes().to_vec())
            .await
            .context("control topic closed")?;
        debug!(offset, "control message queued");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::bus::{MessageSource, topic};

    #[tokio::test]
    async fn lines_become_messages_in_order() {
        let input: &[u8] = b"{\"a\":1}\n\n   \n{\"b\":2}\n";
        let (producer, mut consumer) = topic("control", 8);
        let (_tx, rx) = watch::channel(false);

        run_control_intake(input, producer, rx).await.unwrap();

        let first = consumer.fetch().await.unwrap();
        let second = consumer.fetch().await.unwrap();
        assert_eq!(first.payload, br#"{"a":1}"#.to_vec());
        assert_eq!(second.payload, br#"{"b":2}"#.to_vec());
        assert_eq!(second.offset, 1);
        assert!(consumer.fetch().await.is_err());
    }
}
