//! Wire format of the WhiteBIT WebSocket API.
//!
//! Outbound frames are commands `{"id":..,"method":..,"params":[..]}`. Inbound
//! frames are either responses to a command (`result` or `error` keyed by the
//! command `id`) or server pushes (`method` + `params`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const PING_METHOD: &str = "ping";
pub const AUTHORIZE_METHOD: &str = "authorize";

/// Id the heartbeat ping is sent with; the matching pong is recognised by it.
pub const HEARTBEAT_ID: i64 = 0;

/// An outbound request or subscription.
///
/// Field order is the serialization order, which keeps encoded frames
/// deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: i64,
    pub method: String,
    pub params: Vec<Value>,
}

impl Command {
    pub fn new(id: i64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// `{"id":0,"method":"ping","params":[]}`
    pub fn ping() -> Self {
        Self::new(HEARTBEAT_ID, PING_METHOD, Vec::new())
    }

    pub fn authorize(id: i64, token: &str, client_id: &str) -> Self {
        Self::new(
            id,
            AUTHORIZE_METHOD,
            vec![Value::from(token), Value::from(client_id)],
        )
    }
}

/// A decoded inbound frame. Built by [`decode`], which classifies by key
/// presence rather than by shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Response {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },
    Push {
        method: String,
        params: Value,
    },
}

impl Envelope {
    /// Error raised by the session itself rather than the exchange.
    /// Serializes as `{"error": <description>}`.
    pub fn session_error(description: impl Into<String>) -> Self {
        Envelope::Response {
            id: None,
            result: None,
            error: Some(Value::String(description.into())),
        }
    }

    /// Heartbeat reply: `{"id":0,"result":"pong"}`.
    pub fn is_pong(&self) -> bool {
        matches!(
            self,
            Envelope::Response {
                id: Some(HEARTBEAT_ID),
                result: Some(Value::String(result)),
                ..
            } if result == "pong"
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Envelope::Response { error: Some(e), .. } if !e.is_null())
    }

    /// Method name of a push, `None` for responses.
    pub fn method(&self) -> Option<&str> {
        match self {
            Envelope::Push { method, .. } => Some(method),
            Envelope::Response { .. } => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("frame is not a JSON object: {0}")]
    NotAnObject(String),

    #[error("frame carries neither result/error nor method: {0}")]
    Unclassified(String),
}

pub fn encode(command: &Command) -> Result<String, serde_json::Error> {
    serde_json::to_string(command)
}

pub fn decode(text: &str) -> Result<Envelope, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(mut map) = value else {
        return Err(DecodeError::NotAnObject(text.to_string()));
    };

    if map.contains_key("result") || map.contains_key("error") {
        return Ok(Envelope::Response {
            id: map.get("id").and_then(Value::as_i64),
            result: take_non_null(&mut map, "result"),
            error: take_non_null(&mut map, "error"),
        });
    }

    match map.remove("method") {
        Some(Value::String(method)) => Ok(Envelope::Push {
            method,
            params: map.remove("params").unwrap_or(Value::Null),
        }),
        _ => Err(DecodeError::Unclassified(text.to_string())),
    }
}

fn take_non_null(map: &mut Map<String, Value>, key: &str) -> Option<Value> {
    map.remove(key).filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_key_order() {
        let cmd = Command::new(
            42,
            "deals_request",
            vec![json!("BTC_USDT"), json!(0), json!(100)],
        );
        assert_eq!(
            encode(&cmd).unwrap(),
            r#"{"id":42,"method":"deals_request","params":["BTC_USDT",0,100]}"#
        );
    }

    #[test]
    fn test_ping_frame() {
        assert_eq!(
            encode(&Command::ping()).unwrap(),
            r#"{"id":0,"method":"ping","params":[]}"#
        );
    }

    #[test]
    fn test_authorize_frame() {
        let cmd = Command::authorize(1700000000000, "tok", "rust-sdk");
        assert_eq!(
            encode(&cmd).unwrap(),
            r#"{"id":1700000000000,"method":"authorize","params":["tok","rust-sdk"]}"#
        );
    }

    #[test]
    fn test_encode_never_yields_empty_frame() {
        // Non-finite numbers become null inside a Value.
        let cmd = Command::new(1, "kline_request", vec![json!(f64::NAN)]);
        let frame = encode(&cmd).unwrap();
        assert_eq!(frame, r#"{"id":1,"method":"kline_request","params":[null]}"#);
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_decode_pong() {
        let env = decode(r#"{"id":0,"result":"pong","error":null}"#).unwrap();
        assert!(env.is_pong());
        assert!(!env.is_error());
    }

    #[test]
    fn test_result_pong_with_other_id_is_not_heartbeat() {
        let env = decode(r#"{"id":7,"result":"pong"}"#).unwrap();
        assert!(!env.is_pong());
    }

    #[test]
    fn test_decode_response_with_error() {
        let env = decode(r#"{"id":5,"result":null,"error":{"code":1,"message":"invalid"}}"#)
            .unwrap();
        assert_eq!(
            env,
            Envelope::Response {
                id: Some(5),
                result: None,
                error: Some(json!({"code":1,"message":"invalid"})),
            }
        );
        assert!(env.is_error());
    }

    #[test]
    fn test_decode_push() {
        let env =
            decode(r#"{"id":null,"method":"deals_update","params":["BTC_USDT",[]]}"#).unwrap();
        assert_eq!(env.method(), Some("deals_update"));
        match env {
            Envelope::Push { params, .. } => assert_eq!(params, json!(["BTC_USDT", []])),
            other => panic!("expected push, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode("{not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode("[1,2]"), Err(DecodeError::NotAnObject(_))));
        assert!(matches!(
            decode(r#"{"id":3}"#),
            Err(DecodeError::Unclassified(_))
        ));
    }

    #[test]
    fn test_session_error_shape() {
        let env = Envelope::session_error("boom");
        assert_eq!(env.to_value(), json!({"error": "boom"}));
        assert!(env.is_error());
    }
}
