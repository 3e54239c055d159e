//! The `transport` module is the realtime client sessions use to talk to
//! the broker over websockets.
//!
//! It defines the JSON protocol frames exchanged with the broker and a
//! tokio-tungstenite client that connects, subscribes, reconnects with
//! backoff and reports everything it observes as session events.

pub mod message;
pub mod websocket;

pub use websocket::{ReconnectPolicy, WebSocketConnector};

#[cfg(test)]
mod tests;
