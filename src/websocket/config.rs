use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use super::backoff::DEFAULT_BACKOFF_CAP_SECS;

pub const PROD_WS_URL: &str = "wss://api.whitebit.com/ws";
pub const DEFAULT_CLIENT_ID: &str = "rust-sdk";
pub const MAX_RECONNECT: u32 = 10; // Consecutive failed attempts before giving up
pub const PING_INTERVAL_SECS: u64 = 10;
pub const READ_TIMEOUT_SECS: u64 = 15; // Silent read treated as a stall
pub const CONNECT_TIMEOUT_SECS: u64 = 10;
pub const OUTBOUND_BUFFER: usize = 64;
pub const MAX_HELD_FRAMES: usize = 1024; // Inbound frames kept while the replay is pending
/// Floor applied to every configured interval and timeout.
pub const MIN_INTERVAL_SECS: u64 = 1;

/// What `request()` does when no connection is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestPolicy {
    /// Return `NotConnected` immediately.
    FailFast,
    /// Wait up to the given number of seconds for the session to become live.
    WaitForConnection(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsocketClientConfig {
    pub url: String,
    /// Sent as the second `authorize` parameter.
    pub client_id: String,
    pub max_reconnect: u32,
    pub ping_interval_secs: u64,
    pub read_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub backoff_cap_secs: u64,
    pub outbound_buffer: usize,
    /// Oldest frames are dropped beyond this while authorize/replay is pending.
    #[serde(default = "default_max_held_frames")]
    pub max_held_frames: usize,
    pub request_policy: RequestPolicy,
}

fn default_max_held_frames() -> usize {
    MAX_HELD_FRAMES
}

impl Default for WebsocketClientConfig {
    fn default() -> Self {
        Self {
            url: PROD_WS_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            max_reconnect: MAX_RECONNECT,
            ping_interval_secs: PING_INTERVAL_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            backoff_cap_secs: DEFAULT_BACKOFF_CAP_SECS,
            outbound_buffer: OUTBOUND_BUFFER,
            max_held_frames: MAX_HELD_FRAMES,
            request_policy: RequestPolicy::FailFast,
        }
    }
}

impl WebsocketClientConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `WHITEBIT_WS_URL`, `WHITEBIT_WS_CLIENT_ID` and
    /// `WHITEBIT_WS_MAX_RECONNECT` when they are set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("WHITEBIT_WS_URL") {
            config.url = url;
        }
        if let Ok(client_id) = std::env::var("WHITEBIT_WS_CLIENT_ID") {
            config.client_id = client_id;
        }
        if let Some(max) = std::env::var("WHITEBIT_WS_MAX_RECONNECT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.max_reconnect = max;
        }
        config
    }

    // A zero interval would make the read loop spin on pings.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(MIN_INTERVAL_SECS))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs.max(MIN_INTERVAL_SECS))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(MIN_INTERVAL_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WebsocketClientConfig::default();
        assert_eq!(config.url, "wss://api.whitebit.com/ws");
        assert_eq!(config.max_reconnect, 10);
        assert_eq!(config.ping_interval(), Duration::from_secs(10));
        assert_eq!(config.read_timeout(), Duration::from_secs(15));
        assert_eq!(config.backoff_cap_secs, 180);
        assert_eq!(config.request_policy, RequestPolicy::FailFast);
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        let config = WebsocketClientConfig {
            ping_interval_secs: 0,
            read_timeout_secs: 0,
            connect_timeout_secs: 0,
            ..WebsocketClientConfig::default()
        };
        assert_eq!(config.ping_interval(), Duration::from_secs(1));
        assert_eq!(config.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.connect_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_deserializes_from_json() {
        let config: WebsocketClientConfig = serde_json::from_str(
            r#"{
                "url": "ws://127.0.0.1:9000",
                "client_id": "bot",
                "max_reconnect": 3,
                "ping_interval_secs": 5,
                "read_timeout_secs": 7,
                "connect_timeout_secs": 2,
                "backoff_cap_secs": 30,
                "outbound_buffer": 8,
                "request_policy": {"WaitForConnection": 4}
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_reconnect, 3);
        assert_eq!(config.request_policy, RequestPolicy::WaitForConnection(4));
        assert_eq!(config.max_held_frames, MAX_HELD_FRAMES);
    }
}
