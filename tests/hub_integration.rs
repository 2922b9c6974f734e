//! End-to-end: sampler, scheduler and websocket server on a loopback port.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use time::UtcOffset;

use sensorhub::hub::{run_scheduler, HubServer, SystemClock};
use sensorhub::models::RawReading;
use sensorhub::sensors::spawn_sampler;
use sensorhub::telemetry::Aggregator;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_hub(max_connections: usize) -> SocketAddr {
    let source = || RawReading {
        temperature: Some(23.46),
        humidity: Some(38.7),
        co2: Some(710),
    };
    let (samples, _sampler) = spawn_sampler(source, Duration::from_millis(5));

    let server = HubServer::bind_addr("127.0.0.1:0", "/sensors", "SensorHub", max_connections)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let (command_tx, command_rx) = mpsc::channel(16);
    tokio::spawn(server.serve(command_tx));

    tokio::spawn(run_scheduler(
        Aggregator::new(180, Duration::from_millis(1000), 1),
        samples,
        command_rx,
        SystemClock::new(UtcOffset::UTC),
        Duration::from_millis(20),
    ));

    // let the first sample become canonical
    tokio::time::sleep(Duration::from_millis(200)).await;
    addr
}

/// Next text frame that is not a liveness marker
async fn next_text(client: &mut Client) -> String {
    loop {
        let message = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = message {
            if text != "P:" {
                return text;
            }
        }
    }
}

#[tokio::test]
async fn join_replays_then_answers_requests() {
    let addr = start_hub(4).await;
    let (mut client, _) = connect_async(format!("ws://{}/sensors", addr)).await.unwrap();

    assert_eq!(next_text(&mut client).await, "H:38");
    assert_eq!(next_text(&mut client).await, "T:23.4");
    assert_eq!(next_text(&mut client).await, "C:710");

    client.send(Message::Text("G:\n".into())).await.unwrap();
    assert_eq!(next_text(&mut client).await, "G:\n");

    client.send(Message::Text("hello".into())).await.unwrap();
    assert_eq!(next_text(&mut client).await, "unknown command");
}

#[tokio::test]
async fn wrong_path_gets_not_found() {
    let addr = start_hub(4).await;
    let err = connect_async(format!("ws://{}/other", addr)).await.unwrap_err();
    match err {
        WsError::Http(response) => {
            assert_eq!(response.status(), 404);
            let body = response.body().clone().unwrap_or_default();
            let body = String::from_utf8_lossy(&body).into_owned();
            assert!(body.contains("SensorHub"));
            assert!(body.ends_with("/sensors"));
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn connections_beyond_limit_are_refused() {
    let addr = start_hub(1).await;
    let (mut first, _) = connect_async(format!("ws://{}/sensors", addr)).await.unwrap();
    assert_eq!(next_text(&mut first).await, "H:38");

    let second = timeout(
        Duration::from_secs(5),
        connect_async(format!("ws://{}/sensors", addr)),
    )
    .await
    .expect("refusal should be immediate");
    assert!(second.is_err());
}
