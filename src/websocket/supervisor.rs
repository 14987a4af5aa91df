//! Connection lifecycle of a WebSocket session.
//!
//! The supervisor task owns the socket for as long as the session lives. Each
//! connection attempt multiplexes two futures on that task: the read loop,
//! which is the only writer of the socket and also drives the heartbeat, and
//! the replay future, which waits for the socket to come up, authorizes it
//! when a token source is configured and resends the registered
//! subscriptions. Whichever of the two fails first ends the attempt and the
//! other one is dropped with it.

use crate::auth::get_timestamp_ms;
use crate::error::{Result, WhitebitError};
use futures_util::{SinkExt, StreamExt};
use log::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex, Notify};
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::backoff;
use super::codec::{self, Command, Envelope};
use super::config::WebsocketClientConfig;
use super::liveness::LivenessMonitor;
use super::registry::SubscriptionRegistry;
use super::token::TokenSource;
use super::transport::{Connector, WsSink, WsSource};

/// Receives every forwarded push, response and session error.
///
/// Called inline from the read loop, so it has to return quickly.
pub type MessageHandler = Arc<dyn Fn(Envelope) + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Live,
    Backoff,
    /// Reconnect budget exhausted. Terminal.
    Failed,
}

/// State guarded together so that a replay snapshot and the publication of
/// the live sender cannot interleave with a concurrent subscribe.
#[derive(Default)]
pub(crate) struct Outbound {
    pub(crate) registry: SubscriptionRegistry,
    pub(crate) sender: Option<mpsc::Sender<Message>>,
}

pub(crate) struct SessionShared {
    pub(crate) config: WebsocketClientConfig,
    pub(crate) url: Url,
    pub(crate) outbound: Mutex<Outbound>,
    pub(crate) state: watch::Sender<ConnectionState>,
    pub(crate) dead: AtomicBool,
    pub(crate) shutdown: CancellationToken,
    pub(crate) handler: MessageHandler,
    pub(crate) token_source: Option<Arc<dyn TokenSource>>,
    pub(crate) connector: Arc<dyn Connector>,
    last_id: AtomicI64,
}

impl SessionShared {
    pub(crate) fn new(
        config: WebsocketClientConfig,
        url: Url,
        connector: Arc<dyn Connector>,
        token_source: Option<Arc<dyn TokenSource>>,
        handler: MessageHandler,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            url,
            outbound: Mutex::new(Outbound::default()),
            state,
            dead: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            handler,
            token_source,
            connector,
            last_id: AtomicI64::new(0),
        }
    }

    /// Millisecond timestamp, bumped when needed so ids never repeat within a session.
    pub(crate) fn next_id(&self) -> i64 {
        let now = get_timestamp_ms() as i64;
        let previous = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!("[Supervisor] {:?} -> {:?}", previous, next);
        }
    }

    fn emit(&self, envelope: Envelope) {
        (self.handler)(envelope);
    }
}

enum ConnectionEnd {
    Shutdown,
    Failed(WhitebitError),
}

/// Runs connect / read / backoff cycles until shutdown or until the
/// reconnect budget is spent.
pub(crate) async fn run(shared: Arc<SessionShared>) {
    let mut attempts: u32 = 0;
    let mut rng = StdRng::from_entropy();

    loop {
        if shared.shutdown.is_cancelled() {
            break;
        }

        info!("[Supervisor] Attempting connection (Retry {})...", attempts);
        shared.set_state(ConnectionState::Connecting);
        let end = connect_and_run(&shared, &mut attempts).await;
        shared.outbound.lock().await.sender = None;

        match end {
            ConnectionEnd::Shutdown => break,
            ConnectionEnd::Failed(err) => {
                warn!("[Supervisor] Connection lost: {}", err);
                shared.set_state(ConnectionState::Backoff);
                shared.emit(Envelope::session_error(err.to_string()));
            }
        }
        if shared.shutdown.is_cancelled() {
            break;
        }

        // Every failure passes through Backoff; only the budget check leads to Failed.
        attempts += 1;
        if attempts >= shared.config.max_reconnect {
            let err = WhitebitError::ReconnectExhausted { attempts };
            error!("[Supervisor] {}. Stopping connection attempts.", err);
            shared.dead.store(true, Ordering::SeqCst);
            shared.set_state(ConnectionState::Failed);
            shared.emit(Envelope::session_error(err.to_string()));
            return;
        }

        let wait = backoff::reconnect_wait(attempts, shared.config.backoff_cap_secs, &mut rng);
        warn!(
            "[Supervisor] Disconnected. Retrying in {} seconds (attempt {}/{})...",
            wait.as_secs(),
            attempts,
            shared.config.max_reconnect
        );
        tokio::select! {
            _ = shared.shutdown.cancelled() => break,
            _ = sleep(wait) => {}
        }
    }

    shared.set_state(ConnectionState::Disconnected);
    info!("[Supervisor] Task finished.");
}

async fn connect_and_run(shared: &Arc<SessionShared>, attempts: &mut u32) -> ConnectionEnd {
    let connect = timeout(
        shared.config.connect_timeout(),
        shared.connector.connect(&shared.url),
    );
    let (sink, source) = tokio::select! {
        _ = shared.shutdown.cancelled() => return ConnectionEnd::Shutdown,
        res = connect => match res {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return ConnectionEnd::Failed(e),
            Err(_) => {
                return ConnectionEnd::Failed(WhitebitError::TransportError(format!(
                    "connect timed out after {}s",
                    shared.config.connect_timeout().as_secs()
                )))
            }
        }
    };
    info!("[Supervisor] Connection established.");

    let (tx, rx) = mpsc::channel::<Message>(shared.config.outbound_buffer.max(1));
    let established = Notify::new();
    let (ready_tx, ready_rx) = oneshot::channel::<()>();

    let read_loop = read_loop(shared, sink, source, rx, &established, ready_rx);
    let replay = replay(shared, tx, &established, ready_tx);
    tokio::pin!(read_loop, replay);

    let mut replay_done = false;
    loop {
        tokio::select! {
            res = &mut replay, if !replay_done => match res {
                Ok(()) => {
                    replay_done = true;
                    *attempts = 0;
                }
                Err(e) => {
                    error!("[Supervisor] Replay failed: {}", e);
                    return ConnectionEnd::Failed(e);
                }
            },
            end = &mut read_loop => return end,
        }
    }
}

/// Waits for the socket, authorizes it if possible, resends every registered
/// subscription and then publishes the connection as live.
async fn replay(
    shared: &SessionShared,
    tx: mpsc::Sender<Message>,
    established: &Notify,
    ready: oneshot::Sender<()>,
) -> Result<()> {
    established.notified().await;

    if let Some(token_source) = &shared.token_source {
        shared.set_state(ConnectionState::Authenticating);
        let token = token_source.ws_token().await?;
        let authorize = Command::authorize(shared.next_id(), &token, &shared.config.client_id);
        send_via(&tx, &authorize).await?;
        info!("[Supervisor] Auth message sent.");
    }

    let mut outbound = shared.outbound.lock().await;
    let snapshot = outbound.registry.snapshot();
    if !snapshot.is_empty() {
        info!("[Supervisor] Resubscribing to {} channels...", snapshot.len());
    }
    for command in &snapshot {
        send_via(&tx, command).await?;
        debug!("[Supervisor] Resubscribed {}", command.method);
    }
    outbound.sender = Some(tx);
    drop(outbound);

    shared.set_state(ConnectionState::Live);
    let _ = ready.send(());
    Ok(())
}

async fn read_loop(
    shared: &SessionShared,
    mut sink: WsSink,
    mut source: WsSource,
    mut outbound: mpsc::Receiver<Message>,
    established: &Notify,
    mut ready: oneshot::Receiver<()>,
) -> ConnectionEnd {
    let mut liveness = LivenessMonitor::new(shared.config.ping_interval());
    if let Err(e) = send_ping(&mut sink, &mut liveness).await {
        return ConnectionEnd::Failed(e);
    }
    established.notify_one();

    let read_timeout = shared.config.read_timeout();
    let mut replayed = false;
    let mut outbound_open = true;
    // Frames that arrive before the replay has been written.
    let mut held: VecDeque<Envelope> = VecDeque::new();
    let max_held = shared.config.max_held_frames.max(1);

    loop {
        if liveness.ping_due(Instant::now()) {
            if let Err(e) = send_ping(&mut sink, &mut liveness).await {
                return ConnectionEnd::Failed(e);
            }
        }
        let wait = read_timeout.min(liveness.until_ping_due(Instant::now()));

        tokio::select! {
            biased;

            _ = shared.shutdown.cancelled() => {
                info!("[Supervisor] Shutdown requested, closing socket.");
                let _ = sink.send(Message::Close(None)).await;
                let _ = sink.close().await;
                return ConnectionEnd::Shutdown;
            }
            res = &mut ready, if !replayed => {
                replayed = true;
                if res.is_ok() {
                    // Replay frames are queued; put them on the wire first.
                    while let Ok(message) = outbound.try_recv() {
                        if let Err(e) = sink.send(message).await {
                            return ConnectionEnd::Failed(e.into());
                        }
                    }
                    for envelope in held.drain(..) {
                        shared.emit(envelope);
                    }
                }
            }
            message = outbound.recv(), if outbound_open => match message {
                Some(message) => {
                    trace!("Sending WS message: {}", message);
                    if let Err(e) = sink.send(message).await {
                        return ConnectionEnd::Failed(e.into());
                    }
                }
                None => outbound_open = false,
            },
            frame = timeout(wait, source.next()) => match frame {
                Err(_) => {
                    if !liveness.ping_due(Instant::now()) {
                        debug!("No data for {:?}, sending ping", wait);
                    }
                    if let Err(e) = send_ping(&mut sink, &mut liveness).await {
                        return ConnectionEnd::Failed(e);
                    }
                }
                Ok(None) => {
                    return ConnectionEnd::Failed(WhitebitError::TransportError(
                        "WebSocket stream ended".to_string(),
                    ));
                }
                Ok(Some(Err(e))) => {
                    error!("WebSocket read error: {}", e);
                    return ConnectionEnd::Failed(e.into());
                }
                Ok(Some(Ok(message))) => match message {
                    Message::Text(text) => match codec::decode(&text) {
                        Ok(envelope) if envelope.is_pong() => trace!("Received pong"),
                        Ok(envelope) if replayed => shared.emit(envelope),
                        Ok(envelope) => {
                            if held.len() >= max_held {
                                held.pop_front();
                                warn!(
                                    "Replay still pending, dropping oldest held frame ({} held)",
                                    max_held
                                );
                            }
                            held.push_back(envelope);
                        }
                        Err(e) => warn!("Dropping undecodable frame: {}", e),
                    },
                    Message::Ping(data) => {
                        if let Err(e) = sink.send(Message::Pong(data)).await {
                            return ConnectionEnd::Failed(e.into());
                        }
                    }
                    Message::Close(close_frame) => {
                        warn!("Received WS Close frame: {:?}", close_frame);
                        return ConnectionEnd::Failed(WhitebitError::TransportError(format!(
                            "connection closed by remote: {:?}",
                            close_frame
                        )));
                    }
                    Message::Binary(bin) => trace!("Ignoring binary frame ({} bytes)", bin.len()),
                    Message::Pong(_) | Message::Frame(_) => {}
                },
            },
        }
    }
}

async fn send_ping(sink: &mut WsSink, liveness: &mut LivenessMonitor) -> Result<()> {
    sink.send(Message::Text(codec::encode(&Command::ping())?))
        .await?;
    liveness.mark_ping_sent(Instant::now());
    Ok(())
}

pub(crate) async fn send_via(tx: &mpsc::Sender<Message>, command: &Command) -> Result<()> {
    let text = codec::encode(command).map_err(|e| {
        error!("Failed to encode {}: {}", command.method, e);
        WhitebitError::from(e)
    })?;
    tx.send(Message::Text(text))
        .await
        .map_err(|_| WhitebitError::TransportError("connection writer closed".to_string()))
}
