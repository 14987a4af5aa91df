use crate::error::{Result, WhitebitError};
use log::*;
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::protocol::Message;
use url::Url;

use super::channel::{subscribe_method_for, Channel};
use super::codec::Command;
use super::config::{RequestPolicy, WebsocketClientConfig};
use super::supervisor::{self, send_via, ConnectionState, MessageHandler, SessionShared};
use super::token::TokenSource;
use super::transport::{Connector, TungsteniteConnector};

/// Price intervals accepted by the depth channel.
pub const DEPTH_PRICE_INTERVALS: [&str; 9] = [
    "0.00000001",
    "0.0000001",
    "0.000001",
    "0.00001",
    "0.0001",
    "0.001",
    "0.01",
    "0.1",
    "0",
];

/// A persistent WhiteBIT WebSocket session.
///
/// The connection is opened, kept alive and re-established in the background;
/// subscriptions registered through this client are replayed on every new
/// connection. Pushes, responses and session errors all arrive through the
/// single `on_message` handler given at construction.
pub struct WhitebitWsClient {
    shared: Arc<SessionShared>,
    // Handle to the supervisor task
    manager_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl WhitebitWsClient {
    /// Starts a session against `config.url`.
    ///
    /// Pass a `token_source` (for example the REST [`Client`](crate::rest::Client))
    /// to authorize every connection and unlock private channels.
    pub async fn connect(
        config: WebsocketClientConfig,
        token_source: Option<Arc<dyn TokenSource>>,
        on_message: MessageHandler,
    ) -> Result<Self> {
        Self::connect_with(
            config,
            Arc::new(TungsteniteConnector),
            token_source,
            on_message,
        )
        .await
    }

    /// Same as [`connect`](Self::connect) with a custom transport.
    pub async fn connect_with(
        config: WebsocketClientConfig,
        connector: Arc<dyn Connector>,
        token_source: Option<Arc<dyn TokenSource>>,
        on_message: MessageHandler,
    ) -> Result<Self> {
        let url = Url::parse(&config.url)?;
        let shared = Arc::new(SessionShared::new(
            config,
            url,
            connector,
            token_source,
            on_message,
        ));
        let manager_handle = tokio::spawn(supervisor::run(Arc::clone(&shared)));

        Ok(Self {
            shared,
            manager_handle: std::sync::Mutex::new(Some(manager_handle)),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Watch channel following every state transition.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// True once the reconnect budget is spent; the session will not recover.
    pub fn is_dead(&self) -> bool {
        self.shared.dead.load(Ordering::SeqCst)
    }

    pub fn is_authenticated(&self) -> bool {
        self.shared.token_source.is_some()
    }

    /// Registered subscriptions in replay order.
    pub async fn subscriptions(&self) -> Vec<Command> {
        self.shared.outbound.lock().await.registry.snapshot()
    }

    /// Session-unique command id.
    pub fn next_id(&self) -> i64 {
        self.shared.next_id()
    }

    /// Waits until the session is live, failing if it dies or `limit` elapses.
    pub async fn wait_until_live(&self, limit: Duration) -> Result<()> {
        let mut rx = self.state_receiver();
        let reached = timeout(
            limit,
            rx.wait_for(|s| matches!(s, ConnectionState::Live | ConnectionState::Failed)),
        )
        .await;
        match reached {
            Ok(Ok(state)) if *state == ConnectionState::Live => Ok(()),
            Ok(_) => Err(self.exhausted()),
            Err(_) => Err(WhitebitError::NotConnected),
        }
    }

    /// Registers a subscription and sends it if a connection is live.
    ///
    /// While disconnected the command is only registered; it goes out with
    /// the replay of the next connection.
    pub async fn subscribe(&self, command: Command) -> Result<()> {
        self.ensure_alive()?;
        self.ensure_authorized(&command.method)?;

        let mut outbound = self.shared.outbound.lock().await;
        outbound.registry.add(command.clone());
        match outbound.sender.as_ref() {
            Some(tx) => {
                if let Err(e) = send_via(tx, &command).await {
                    debug!("Subscribe '{}' deferred to replay: {}", command.method, e);
                }
            }
            None => debug!("Not connected, '{}' deferred to replay", command.method),
        }
        Ok(())
    }

    /// Drops the matching subscription and sends the unsubscribe if live.
    ///
    /// The registry entry is removed even while disconnected, so it will not
    /// be replayed.
    pub async fn unsubscribe(&self, command: Command) -> Result<()> {
        let subscribe_method = subscribe_method_for(&command.method);

        let mut outbound = self.shared.outbound.lock().await;
        outbound.registry.remove(&subscribe_method);
        if let Some(tx) = outbound.sender.as_ref() {
            if let Err(e) = send_via(tx, &command).await {
                debug!("Unsubscribe '{}' not sent: {}", command.method, e);
            }
        }
        Ok(())
    }

    /// Sends a one-shot command.
    ///
    /// Without a live connection the configured [`RequestPolicy`] decides
    /// between failing with `NotConnected` and waiting for one.
    pub async fn request(&self, command: Command) -> Result<()> {
        self.ensure_alive()?;
        self.ensure_authorized(&command.method)?;

        let tx = match self.live_sender().await {
            Some(tx) => tx,
            None => match self.shared.config.request_policy {
                RequestPolicy::FailFast => return Err(WhitebitError::NotConnected),
                RequestPolicy::WaitForConnection(secs) => {
                    self.wait_until_live(Duration::from_secs(secs)).await?;
                    self.live_sender()
                        .await
                        .ok_or(WhitebitError::NotConnected)?
                }
            },
        };
        send_via(&tx, &command)
            .await
            .map_err(|_| WhitebitError::NotConnected)
    }

    /// Stops the session: cancels any pending read or backoff, closes the
    /// socket and waits for the supervisor to finish in `Disconnected`
    /// (or `Failed` if it had already given up).
    pub async fn stop(&self) {
        info!("Stopping WebSocket client...");
        self.shared.shutdown.cancel();
        let handle = self
            .manager_handle
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Supervisor task panicked: {}", e);
            }
        }
        info!("WebSocket client stopped.");
    }

    // --- Channel helpers ---

    pub async fn subscribe_channel(&self, channel: Channel, params: Vec<Value>) -> Result<()> {
        let command = Command::new(self.next_id(), channel.methods().subscribe, params);
        self.subscribe(command).await
    }

    pub async fn unsubscribe_channel(&self, channel: Channel) -> Result<()> {
        let command = Command::new(self.next_id(), channel.methods().unsubscribe, Vec::new());
        self.unsubscribe(command).await
    }

    pub async fn request_channel(&self, channel: Channel, params: Vec<Value>) -> Result<()> {
        let command = Command::new(self.next_id(), channel.methods().request, params);
        self.request(command).await
    }

    pub async fn get_deals(&self, market: &str, offset: u64, limit: u64) -> Result<()> {
        self.request_channel(
            Channel::Deals,
            vec![Value::from(market), Value::from(offset), Value::from(limit)],
        )
        .await
    }

    pub async fn subscribe_deals(&self, markets: &[&str]) -> Result<()> {
        self.subscribe_channel(Channel::Deals, vec![Value::from(markets.to_vec())])
            .await
    }

    pub async fn get_kline(
        &self,
        market: &str,
        start_time: u64,
        end_time: u64,
        interval: u64,
    ) -> Result<()> {
        self.request_channel(
            Channel::Candles,
            vec![
                Value::from(market),
                Value::from(start_time),
                Value::from(end_time),
                Value::from(interval),
            ],
        )
        .await
    }

    pub async fn subscribe_kline(&self, market: &str, interval: u64) -> Result<()> {
        self.subscribe_channel(
            Channel::Candles,
            vec![Value::from(market), Value::from(interval)],
        )
        .await
    }

    pub async fn get_market_depth(
        &self,
        market: &str,
        limit: u32,
        price_interval: &str,
    ) -> Result<()> {
        check_price_interval(price_interval)?;
        self.request_channel(
            Channel::Depth,
            vec![
                Value::from(market),
                Value::from(limit),
                Value::from(price_interval),
            ],
        )
        .await
    }

    pub async fn subscribe_market_depth(
        &self,
        market: &str,
        limit: u32,
        price_interval: &str,
        multiple_sub: bool,
    ) -> Result<()> {
        check_price_interval(price_interval)?;
        self.subscribe_channel(
            Channel::Depth,
            vec![
                Value::from(market),
                Value::from(limit),
                Value::from(price_interval),
                Value::from(multiple_sub),
            ],
        )
        .await
    }

    pub async fn subscribe_last_price(&self, markets: &[&str]) -> Result<()> {
        self.subscribe_channel(Channel::LastPrice, string_params(markets))
            .await
    }

    pub async fn subscribe_market_trades(&self, markets: &[&str]) -> Result<()> {
        self.subscribe_channel(Channel::Trades, string_params(markets))
            .await
    }

    pub async fn subscribe_spot_balance(&self, assets: &[&str]) -> Result<()> {
        self.subscribe_channel(Channel::SpotBalance, string_params(assets))
            .await
    }

    pub async fn get_time(&self) -> Result<()> {
        self.request(Command::new(self.next_id(), "time", Vec::new()))
            .await
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_dead() {
            return Err(self.exhausted());
        }
        Ok(())
    }

    fn ensure_authorized(&self, method: &str) -> Result<()> {
        let private = Channel::from_method(method).map_or(false, Channel::is_private);
        if private && self.shared.token_source.is_none() {
            return Err(WhitebitError::AuthRequired(format!(
                "'{}' belongs to a private channel; connect with a token source",
                method
            )));
        }
        Ok(())
    }

    fn exhausted(&self) -> WhitebitError {
        WhitebitError::ReconnectExhausted {
            attempts: self.shared.config.max_reconnect,
        }
    }

    async fn live_sender(&self) -> Option<mpsc::Sender<Message>> {
        if self.state() != ConnectionState::Live {
            return None;
        }
        self.shared.outbound.lock().await.sender.clone()
    }
}

impl Drop for WhitebitWsClient {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

fn check_price_interval(price_interval: &str) -> Result<()> {
    if DEPTH_PRICE_INTERVALS.contains(&price_interval) {
        return Ok(());
    }
    Err(WhitebitError::ParameterValueError {
        param: "price_interval".to_string(),
        value: price_interval.to_string(),
        allowed: DEPTH_PRICE_INTERVALS.iter().map(|s| s.to_string()).collect(),
    })
}

fn string_params(values: &[&str]) -> Vec<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}
