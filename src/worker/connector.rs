//! The seam between a session worker and the realtime client it drives.
//!
//! A `Connector` starts a client for one session and hands back a
//! `ConnectionHandle`. The client reports what happens on the wire as
//! `SessionEvent`s through the sender it was given; the worker steers it
//! with `ClientCommand`s through the handle.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;
use tungstenite::http::HeaderValue;
use url::Url;

use super::event::SessionEvent;

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;

/// How long `close` waits for the client task before aborting it.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Everything a client needs to open one session's connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub session_id: String,
    /// Realtime endpoint, e.g. `wss://host/connection/websocket`.
    pub endpoint: Url,
    /// Rendered `Cookie` header carrying the session's credentials.
    pub cookie_header: HeaderValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Subscribe(String),
    Close,
}

/// Starts realtime clients. Implemented by the websocket transport and by
/// test doubles.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, config: ClientConfig, events: EventSender) -> ConnectionHandle;
}

/// Owning handle to a running client task.
#[derive(Debug)]
pub struct ConnectionHandle {
    commands: mpsc::UnboundedSender<ClientCommand>,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    pub fn new(commands: mpsc::UnboundedSender<ClientCommand>, task: JoinHandle<()>) -> Self {
        Self { commands, task }
    }

    /// Ask the client to subscribe to `channel`. Returns false when the
    /// client task has already gone away.
    pub fn subscribe(&self, channel: &str) -> bool {
        self.commands
            .send(ClientCommand::Subscribe(channel.to_string()))
            .is_ok()
    }

    /// Close the connection and wait for the client task to finish.
    pub async fn close(self) {
        let _ = self.commands.send(ClientCommand::Close);

        let mut task = self.task;
        if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
            warn!("realtime client did not stop in time, aborting");
            task.abort();
        }
    }
}
