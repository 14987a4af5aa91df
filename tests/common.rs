// tests/common.rs
#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Once};
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::protocol::{Message, Role};
use tokio_tungstenite::WebSocketStream;
use url::Url;
use whitebit_connector_rs::websocket::{
    Connector, Envelope, MessageHandler, WebsocketClientConfig, WsSink, WsSource,
};
use whitebit_connector_rs::{Result, WhitebitError};

static INIT: Once = Once::new();

// Loads .env (if any) and initializes the logger once per test binary.
pub fn setup() {
    INIT.call_once(|| {
        if dotenv::from_path(".env").is_err() {
            let _ = dotenv::from_path("../.env");
        }
        env_logger::builder().is_test(true).try_init().ok();
    });
}

pub fn get_env_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{} environment variable not set", name))
}

pub type ServerSocket = WebSocketStream<DuplexStream>;

/// Connector handing out in-memory sockets; the server half of every
/// accepted connection is delivered through the returned receiver.
pub struct DuplexConnector {
    servers: mpsc::UnboundedSender<ServerSocket>,
    refuse: AtomicBool,
    connects: AtomicU32,
}

impl DuplexConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerSocket>) {
        let (servers, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            servers,
            refuse: AtomicBool::new(false),
            connects: AtomicU32::new(0),
        });
        (connector, rx)
    }

    pub fn refusing() -> Arc<Self> {
        let (connector, _) = Self::new();
        connector.refuse.store(true, Ordering::SeqCst);
        connector
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for DuplexConnector {
    async fn connect(&self, _url: &Url) -> Result<(WsSink, WsSource)> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(WhitebitError::TransportError(
                "connection refused".to_string(),
            ));
        }

        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        self.servers
            .send(server)
            .map_err(|_| WhitebitError::TransportError("test server gone".to_string()))?;

        let (write, read) = client.split();
        Ok((Box::pin(write), Box::pin(read)))
    }
}

/// Handler forwarding every envelope into a channel the test can read.
pub fn collecting_handler() -> (MessageHandler, mpsc::UnboundedReceiver<Envelope>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler: MessageHandler = Arc::new(move |envelope: Envelope| {
        let _ = tx.send(envelope);
    });
    (handler, rx)
}

pub fn test_config() -> WebsocketClientConfig {
    let mut config = WebsocketClientConfig::with_url("ws://whitebit.test/ws");
    config.max_reconnect = 3;
    config
}

/// Next text frame the client sent, as JSON.
pub async fn next_frame(server: &mut ServerSocket) -> Value {
    loop {
        let message = timeout(Duration::from_secs(60), server.next())
            .await
            .expect("no frame from client")
            .expect("client closed the socket")
            .expect("socket error");
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("client sent invalid JSON");
        }
    }
}

/// Next text frame that is not a heartbeat ping.
pub async fn next_command(server: &mut ServerSocket) -> Value {
    loop {
        let frame = next_frame(server).await;
        if frame["method"] != "ping" {
            return frame;
        }
    }
}

/// Accepts the next connection and consumes its opening ping.
pub async fn accept(servers: &mut mpsc::UnboundedReceiver<ServerSocket>) -> ServerSocket {
    let mut server = timeout(Duration::from_secs(600), servers.recv())
        .await
        .expect("client never reconnected")
        .expect("connector dropped");
    let first = next_frame(&mut server).await;
    assert_eq!(first["method"], "ping", "first frame must be the heartbeat");
    assert_eq!(first["id"], 0);
    server
}

/// Every frame the client has already written, without waiting for more.
pub async fn drain_frames(server: &mut ServerSocket) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(Some(Ok(message))) = timeout(Duration::from_millis(1), server.next()).await {
        if let Message::Text(text) = message {
            frames.push(serde_json::from_str(&text).expect("client sent invalid JSON"));
        }
    }
    frames
}

pub async fn push(server: &mut ServerSocket, frame: Value) {
    server
        .send(Message::Text(frame.to_string()))
        .await
        .expect("failed to write to client");
}

pub async fn push_raw(server: &mut ServerSocket, text: &str) {
    server
        .send(Message::Text(text.to_string()))
        .await
        .expect("failed to write to client");
}

pub async fn next_envelope(inbox: &mut mpsc::UnboundedReceiver<Envelope>) -> Envelope {
    timeout(Duration::from_secs(60), inbox.recv())
        .await
        .expect("handler received nothing")
        .expect("handler dropped")
}
