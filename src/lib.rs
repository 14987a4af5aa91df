//! Client-side connector for the WhiteBIT exchange.
//!
//! - [`rest`]: signed REST client (public market data, trading, account)
//! - [`websocket`]: a self-healing WebSocket session with subscription replay
//!
//! The REST [`Client`](rest::Client) doubles as the token source that
//! authorizes private WebSocket channels.

pub mod auth;
pub mod error;
pub mod rest;
pub mod types;
pub mod websocket;
pub use error::{Result, WhitebitError};
