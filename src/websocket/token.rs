use crate::error::Result;
use async_trait::async_trait;

/// Supplies short-lived tokens for authorizing a WebSocket connection.
///
/// Called once per established connection, so implementations should fetch
/// a fresh token rather than cache one.
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    async fn ws_token(&self) -> Result<String>;
}

/// A fixed token, for tests and for callers that manage tokens themselves.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn ws_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
