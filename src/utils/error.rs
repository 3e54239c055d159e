//! The `error` module defines the error types used within `subswarm`.
//!
//! Each error family belongs to one layer: request validation at the API
//! boundary, worker setup, the realtime transport, and process startup.
//! Nothing raised by a worker or the transport is ever propagated to the
//! registry; those errors end up as status flags and log lines.

use thiserror::Error;

/// A control request that was rejected before touching the registry.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("User ID is not specified")]
    MissingId,

    #[error("Broker url is not specified")]
    MissingBrokerUrl,

    #[error("Can't parse broker url {url}: {source}")]
    InvalidBrokerUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported broker url scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Cookies not found")]
    MissingCookies,

    #[error("Json body parse error: {0}")]
    Body(#[from] serde_json::Error),
}

/// Resource acquisition failure while a session worker initializes.
///
/// Aborts that worker's startup only.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("unsupported broker url scheme: {0}")]
    UnsupportedScheme(String),

    #[error("broker url {0} has no host")]
    MissingHost(String),

    #[error("cookie jar is empty")]
    EmptyJar,

    #[error("invalid cookie header: {0}")]
    InvalidCookieHeader(#[from] tungstenite::http::header::InvalidHeaderValue),
}

/// Failures of the realtime websocket client.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timed out while {0}")]
    Timeout(&'static str),

    #[error("connect rejected ({code}): {message}")]
    Rejected { code: u32, message: String },

    #[error("connection closed during handshake")]
    Closed,
}

/// Startup failures; the only errors that stop the process.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request rejected: {0}")]
    Rejected(#[from] ValidationError),
}
