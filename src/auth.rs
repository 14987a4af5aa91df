use crate::error::{Result, WhitebitError};
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha512;
use std::collections::BTreeMap;

type HmacSha512 = Hmac<Sha512>;

/// Gets the current UTC timestamp in milliseconds since the Unix epoch.
pub fn get_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// API key pair issued by WhiteBIT.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Reads `WHITEBIT_API_KEY` and `WHITEBIT_API_SECRET`.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("WHITEBIT_API_KEY").ok()?;
        let api_secret = std::env::var("WHITEBIT_API_SECRET").ok()?;
        Some(Self { api_key, api_secret })
    }

    /// Both halves of the pair are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "api_key",
                &format!("{}...", self.api_key.chars().take(6).collect::<String>()),
            )
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// The pieces of an authenticated REST call.
///
/// `body` must be sent verbatim: the signature covers its base64 form, so
/// re-serializing the parameters could change key order or spacing and
/// invalidate the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    pub body: String,
    pub payload: String,
    pub signature: String,
}

/// Builds the signed body for a private endpoint.
///
/// The request path, the nonce and `nonceWindow: true` are merged into
/// `params`, the result is serialized as compact JSON with keys in sorted
/// order, base64 encoded into the payload, and the payload is signed with
/// HMAC-SHA512 keyed by the API secret (hex encoded).
pub fn sign_request(
    api_secret: &str,
    path: &str,
    mut params: Map<String, Value>,
    nonce: u64,
) -> Result<SignedPayload> {
    params.insert("request".to_string(), Value::from(path));
    params.insert("nonce".to_string(), Value::from(nonce));
    params.insert("nonceWindow".to_string(), Value::Bool(true));

    let sorted: BTreeMap<String, Value> = params.into_iter().collect();
    let body = serde_json::to_string(&sorted)?;
    let payload = base64::engine::general_purpose::STANDARD.encode(body.as_bytes());
    let signature = generate_signature(api_secret, &payload)?;

    Ok(SignedPayload {
        body,
        payload,
        signature,
    })
}

/// Hex encoded HMAC-SHA512 of `payload` keyed by `api_secret`.
pub fn generate_signature(api_secret: &str, payload: &str) -> Result<String> {
    let mut mac = HmacSha512::new_from_slice(api_secret.as_bytes()).map_err(|e| {
        WhitebitError::AuthenticationError(format!("Invalid API secret for HMAC: {}", e))
    })?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_timestamp_ms_works() {
        let ts = get_timestamp_ms();
        assert!(ts > 1600000000000); // post ~Sept 2020
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("public_key_123456", "very_secret_value");
        let debug_str = format!("{:?}", creds);
        assert!(!debug_str.contains("very_secret_value"));
        assert!(debug_str.contains("public"));
    }

    #[test]
    fn test_credentials_validity() {
        assert!(Credentials::new("key", "secret").is_valid());
        assert!(!Credentials::new("", "secret").is_valid());
        assert!(!Credentials::new("key", "").is_valid());
    }

    #[test]
    fn test_sign_request_body_is_sorted_and_compact() {
        let mut params = Map::new();
        params.insert("ticker".to_string(), json!("BTC"));

        let signed =
            sign_request("secret", "/api/v4/trade-account/balance", params, 1_700_000_000_000)
                .unwrap();

        assert_eq!(
            signed.body,
            r#"{"nonce":1700000000000,"nonceWindow":true,"request":"/api/v4/trade-account/balance","ticker":"BTC"}"#
        );
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&signed.payload)
            .expect("payload is not valid base64");
        assert_eq!(decoded, signed.body.as_bytes());
    }

    #[test]
    fn test_signature_matches_direct_hmac() {
        let signed = sign_request("secret", "/api/v4/order/cancel", Map::new(), 1).unwrap();

        let mut mac = HmacSha512::new_from_slice(b"secret").unwrap();
        mac.update(signed.payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(signed.signature, expected);
        // 512 bits, hex encoded
        assert_eq!(signed.signature.len(), 128);
    }

    #[test]
    fn test_signature_changes_with_secret() {
        let a = generate_signature("secret-a", "payload").unwrap();
        let b = generate_signature("secret-b", "payload").unwrap();
        assert_ne!(a, b);
    }
}
