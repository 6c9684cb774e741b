use std::time::Duration;

use futures::SinkExt;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use backend::feeds::KlineWsFeed;
use engine::bus::{MessageSource, topic};

const FRAME: &str = r#"{"stream":"btcusdt@kline_1m","data":{"s":"BTCUSDT","k":{"i":"1m","x":true,"t":0,"T":59999,"o":"1","h":"1","l":"1","c":"1","v":"1"}}}"#;

/// Serves one frame per connection, then closes it.
async fn serve(listener: TcpListener, connections: usize) {
    for _ in 0..connections {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Ping(Vec::new().into())).await.unwrap();
        ws.send(Message::text(FRAME)).await.unwrap();
        ws.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();
        ws.close(None).await.unwrap();
    }
}

#[tokio::test]
async fn text_frames_are_republished_and_the_feed_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/stream", listener.local_addr().unwrap());
    tokio::spawn(serve(listener, 2));

    let (producer, mut consumer) = topic("data", 8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let feed = KlineWsFeed::new(url).with_reconnect_delay(Duration::from_millis(20));
    let task = tokio::spawn(async move { feed.run(producer, shutdown_rx).await });

    for expected_offset in 0..2 {
        let delivery = tokio::time::timeout(Duration::from_secs(5), consumer.fetch())
            .await
            .expect("no frame forwarded")
            .unwrap();
        assert_eq!(delivery.offset, expected_offset);
        assert_eq!(delivery.payload, FRAME.as_bytes());
    }

    shutdown_tx.send(true).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("feed did not stop")
        .unwrap();
    assert!(result.is_ok());
}
