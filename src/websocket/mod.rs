//! WebSocket API client for WhiteBIT.
//!
//! [`WhitebitWsClient`] keeps a single persistent connection to the exchange
//! and multiplexes one-shot requests, channel subscriptions and server pushes
//! over it.
//!
//! # Architecture
//!
//! - [`codec`]: command encoding and inbound frame classification
//! - [`registry`]: active subscriptions, one per method, replayed on reconnect
//! - [`liveness`]: heartbeat cadence and stall detection
//! - [`backoff`]: jittered reconnect wait
//! - `supervisor`: connect / read / backoff / replay state machine
//! - [`client`]: the public facade
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use whitebit_connector_rs::websocket::{Envelope, WebsocketClientConfig, WhitebitWsClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let handler = Arc::new(|msg: Envelope| {
//!         println!("Received: {}", msg.to_value());
//!     });
//!
//!     let client = WhitebitWsClient::connect(WebsocketClientConfig::default(), None, handler)
//!         .await
//!         .expect("Failed to start session");
//!
//!     client.subscribe_deals(&["BTC_USDT"]).await.expect("Failed to subscribe");
//!
//!     tokio::signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
//!     client.stop().await;
//! }
//! ```
//!
//! # Reconnection Behavior
//!
//! - Full-jitter exponential backoff, capped at 3 minutes
//! - 10 consecutive failed attempts end the session (`ConnectionState::Failed`)
//! - Every new connection is authorized (when a token source is set) and then
//!   receives all registered subscriptions, in registration order
//!
//! Transport failures and the final give-up are reported to the handler as
//! `{"error": ...}` envelopes; they never surface as a panic or a returned
//! error from the background task.

pub mod backoff;
pub mod channel;
pub mod client;
pub mod codec;
pub mod config;
pub mod liveness;
pub mod registry;
mod supervisor;
pub mod token;
pub mod transport;

pub use channel::Channel;
pub use client::WhitebitWsClient;
pub use codec::{Command, DecodeError, Envelope};
pub use config::{RequestPolicy, WebsocketClientConfig};
pub use supervisor::{ConnectionState, MessageHandler};
pub use token::{StaticToken, TokenSource};
pub use transport::{Connector, TungsteniteConnector, WsSink, WsSource};
