//! Broker URL handling
//!
//! The same broker is addressed two ways: over its realtime transport
//! (`ws`/`wss`) when a worker connects, and over its HTTP origin
//! (`http`/`https`) when cookies are scoped to it.

use url::Url;

use crate::utils::error::SetupError;

/// Path suffix of the broker's websocket endpoint.
pub const REALTIME_PATH: &str = "/connection/websocket";

/// Marker prefixed to a session id to name its private channel.
pub const PRIVATE_CHANNEL_PREFIX: char = '#';

/// Name of the private channel a session subscribes to.
pub fn private_channel(session_id: &str) -> String {
    format!("{PRIVATE_CHANNEL_PREFIX}{session_id}")
}

/// Derive the realtime endpoint: `http → ws`, `https → wss`, path joined
/// with [`REALTIME_PATH`].
pub fn realtime_endpoint(broker: &Url) -> Result<Url, SetupError> {
    let scheme = match broker.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(SetupError::UnsupportedScheme(other.to_string())),
    };
    if broker.host_str().is_none() {
        return Err(SetupError::MissingHost(broker.to_string()));
    }

    let mut endpoint = broker.clone();
    endpoint
        .set_scheme(scheme)
        .map_err(|_| SetupError::UnsupportedScheme(broker.scheme().to_string()))?;

    let base = broker.path().trim_end_matches('/');
    endpoint.set_path(&format!("{base}{REALTIME_PATH}"));
    endpoint.set_fragment(None);
    Ok(endpoint)
}

/// Map a realtime URL back to its HTTP origin: `ws → http`, `wss → https`.
/// Other schemes are returned unchanged.
pub fn http_origin(broker: &Url) -> Url {
    let scheme = match broker.scheme() {
        "ws" => "http",
        "wss" => "https",
        _ => return broker.clone(),
    };
    let mut origin = broker.clone();
    // ws/wss and http/https are all special schemes, so this cannot fail
    let _ = origin.set_scheme(scheme);
    origin
}
