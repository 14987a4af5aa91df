use crate::error::{Result, WhitebitError};
use async_trait::async_trait;
use futures_util::{Sink, Stream, StreamExt};
use log::*;
use std::pin::Pin;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

pub use tokio_tungstenite::tungstenite::Error as WsError;

/// Write half of an established connection.
pub type WsSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;
/// Read half of an established connection.
pub type WsSource = Pin<Box<dyn Stream<Item = std::result::Result<Message, WsError>> + Send>>;

/// Opens WebSocket connections for the session.
///
/// Every call must return a fresh, independent socket.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &Url) -> Result<(WsSink, WsSource)>;
}

/// Plain tokio-tungstenite connector (TLS via rustls).
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<(WsSink, WsSource)> {
        info!("Connecting to WebSocket: {}", url);
        let (ws_stream, response) = connect_async(url.as_str()).await.map_err(|e| {
            WhitebitError::TransportError(format!("WebSocket connection failed: {}", e))
        })?;
        debug!(
            "WebSocket connected successfully. Response: {:?}",
            response.status()
        );

        let (write, read) = ws_stream.split();
        Ok((Box::pin(write), Box::pin(read)))
    }
}
