use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use url::ParseError;

pub type Result<T, E = WhitebitError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum WhitebitError {
    #[error("Client Error: status={status}, code={code}, message={message}, errors={errors:?}")]
    ClientError {
        status: StatusCode,
        code: i64,
        message: String,
        errors: Option<Value>,
        header: HeaderMap,
    },

    #[error("Server Error: status={status}, code={code}, message={message}")]
    ServerError {
        status: StatusCode,
        code: i64,
        message: String,
        header: HeaderMap,
    },

    #[error("Parameter Value Error: Invalid value '{value}' for parameter '{param}'. Allowed values: {allowed:?}")]
    ParameterValueError {
        param: String,
        value: String,
        allowed: Vec<String>,
    },

    /// Socket send, receive or connect failure. Fatal to the current connection only.
    #[error("Transport Error: {0}")]
    TransportError(String),

    /// An authenticated operation was attempted on a client without credentials.
    #[error("Authentication Required: {0}")]
    AuthRequired(String),

    #[error("Authentication Error: {0}")]
    AuthenticationError(String),

    /// The session used up its reconnect budget and will not connect again.
    #[error("Reconnect Exhausted: gave up after {attempts} failed connection attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("Not Connected: no live WebSocket connection")]
    NotConnected,

    #[error("HTTP Request Error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON Serialization/Deserialization Error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("URL Parsing Error: {0}")]
    UrlParseError(#[from] ParseError),

    #[error("Invalid HTTP Header Value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
}

impl From<tokio_tungstenite::tungstenite::Error> for WhitebitError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        WhitebitError::TransportError(err.to_string())
    }
}
