//! WebSocket transport
//!
//! This file implements the realtime client behind [`WebSocketConnector`].
//! Responsibilities:
//! - Open the broker's websocket endpoint with the session's cookies
//! - Run the connect handshake and report the result
//! - Send subscribe commands on request and map their replies to events
//! - Forward publications and server pushes as `SessionEvent`s
//! - Reconnect with exponential backoff until told to close
//!
//! The client never touches the registry; the worker that owns the
//! connection decides what each event means for the session.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use tungstenite::client::IntoClientRequest;
use tungstenite::http::header::COOKIE;
use tungstenite::protocol::Message as WsMessage;

use crate::config::BrokerSettings;
use crate::transport::message::{Accepted, Command, Inbound, decode_frame};
use crate::utils::error::TransportError;
use crate::worker::{
    ClientCommand, ClientConfig, ConnectionHandle, Connector, EventSender, SessionEvent,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Name the client announces in its connect command.
pub const CLIENT_NAME: &str = "subswarm";

/// Exponential backoff between reconnect attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(20),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.min_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Starts one websocket client task per session.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    reconnect: ReconnectPolicy,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(reconnect: ReconnectPolicy, connect_timeout: Duration) -> Self {
        Self {
            reconnect,
            connect_timeout,
        }
    }

    pub fn from_settings(settings: &BrokerSettings) -> Self {
        let min_delay = Duration::from_millis(settings.reconnect_min_delay_ms);
        Self::new(
            ReconnectPolicy {
                min_delay,
                max_delay: Duration::from_millis(settings.reconnect_max_delay_ms).max(min_delay),
            },
            Duration::from_secs(settings.connect_timeout_secs),
        )
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self, config: ClientConfig, events: EventSender) -> ConnectionHandle {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let client = RealtimeClient {
            config,
            reconnect: self.reconnect.clone(),
            connect_timeout: self.connect_timeout,
            events,
        };
        let task = tokio::spawn(client.run(rx));
        ConnectionHandle::new(tx, task)
    }
}

/// Why a connected session stopped being served.
enum Exit {
    /// The owner asked to close.
    Closed,
    /// Connection lost; reconnect.
    Lost(String),
    /// The broker disconnected us and asked not to come back.
    Terminated(String),
}

/// Channel bookkeeping for one live connection.
struct Subscriptions {
    next_id: u32,
    pending: HashMap<u32, String>,
    active: HashSet<String>,
}

impl Subscriptions {
    fn new() -> Self {
        Self {
            next_id: crate::transport::message::CONNECT_COMMAND_ID + 1,
            pending: HashMap::new(),
            active: HashSet::new(),
        }
    }

    /// True when `channel` is subscribed or has a subscribe in flight.
    fn contains(&self, channel: &str) -> bool {
        self.active.contains(channel) || self.pending.values().any(|c| c == channel)
    }

    fn next_command_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(2);
        id
    }
}

struct RealtimeClient {
    config: ClientConfig,
    reconnect: ReconnectPolicy,
    connect_timeout: Duration,
    events: EventSender,
}

impl RealtimeClient {
    async fn run(self, mut commands: UnboundedReceiver<ClientCommand>) {
        let mut attempt = 0u32;

        loop {
            let opened = tokio::select! {
                opened = self.open() => opened,
                _ = closed(&mut commands) => return,
            };

            match opened {
                Ok((ws, accepted)) => {
                    attempt = 0;
                    self.emit(SessionEvent::Connected {
                        client_id: accepted.client_id,
                    });
                    for channel in accepted.server_channels {
                        self.emit(SessionEvent::ServerSubscribed { channel });
                    }
                    match self.serve(ws, &mut commands).await {
                        Exit::Closed => return,
                        Exit::Lost(reason) => self.emit(SessionEvent::Disconnected { reason }),
                        Exit::Terminated(reason) => {
                            self.emit(SessionEvent::Disconnected { reason });
                            return;
                        }
                    }
                }
                Err(e) => self.emit(SessionEvent::Error {
                    message: e.to_string(),
                }),
            }

            let delay = self.reconnect.delay(attempt);
            attempt = attempt.saturating_add(1);
            debug!(session = %self.config.session_id, ?delay, attempt, "Reconnecting");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = closed(&mut commands) => return,
            }
        }
    }

    /// Open the websocket and complete the connect handshake.
    async fn open(&self) -> Result<(WsStream, Accepted), TransportError> {
        let mut request = self.config.endpoint.as_str().into_client_request()?;
        request
            .headers_mut()
            .insert(COOKIE, self.config.cookie_header.clone());

        let (mut ws, _response) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| TransportError::Timeout("connecting"))??;

        ws.send(WsMessage::text(Command::connect(CLIENT_NAME).to_json()?))
            .await?;

        let accepted = tokio::time::timeout(self.connect_timeout, connect_reply(&mut ws))
            .await
            .map_err(|_| TransportError::Timeout("waiting for connect reply"))??;

        Ok((ws, accepted))
    }

    async fn serve(&self, mut ws: WsStream, commands: &mut UnboundedReceiver<ClientCommand>) -> Exit {
        let mut subscriptions = Subscriptions::new();

        let exit = loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(ClientCommand::Subscribe(channel)) => {
                        if subscriptions.contains(&channel) {
                            debug!(session = %self.config.session_id, %channel, "Subscription already requested");
                        } else {
                            let id = subscriptions.next_command_id();
                            if let Err(e) = send_command(&mut ws, Command::subscribe(id, &channel)).await {
                                break Exit::Lost(e.to_string());
                            }
                            subscriptions.pending.insert(id, channel);
                        }
                    }
                    Some(ClientCommand::Close) | None => {
                        self.release(&mut ws, &mut subscriptions).await;
                        break Exit::Closed;
                    }
                },
                frame = ws.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Some(exit) = self.handle_text(&mut ws, &mut subscriptions, text.as_str()).await {
                            break exit;
                        }
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.as_str().to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "connection closed".to_string());
                        break Exit::Lost(reason);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Exit::Lost(e.to_string()),
                    None => break Exit::Lost("connection closed".to_string()),
                },
            }
        };

        if !matches!(exit, Exit::Closed) {
            for channel in subscriptions.active.drain() {
                self.emit(SessionEvent::Unsubscribed { channel });
            }
        }
        exit
    }

    async fn handle_text(
        &self,
        ws: &mut WsStream,
        subscriptions: &mut Subscriptions,
        text: &str,
    ) -> Option<Exit> {
        for inbound in decode_frame(text) {
            let inbound = match inbound {
                Ok(inbound) => inbound,
                Err(e) => {
                    warn!(
                        session = %self.config.session_id,
                        error = %e,
                        frame = %text.chars().take(100).collect::<String>(),
                        "Invalid broker frame"
                    );
                    continue;
                }
            };

            match inbound {
                Inbound::Ping => {
                    if let Err(e) = ws.send(WsMessage::text("{}")).await {
                        return Some(Exit::Lost(e.to_string()));
                    }
                }
                Inbound::CommandReply { id, error } => {
                    let Some(channel) = subscriptions.pending.remove(&id) else {
                        continue;
                    };
                    match error {
                        None => {
                            subscriptions.active.insert(channel.clone());
                            self.emit(SessionEvent::Subscribed { channel });
                        }
                        Some(e) => self.emit(SessionEvent::SubscribeError {
                            channel,
                            message: format!("{} ({})", e.message, e.code),
                        }),
                    }
                }
                Inbound::Publication { channel, data } => {
                    self.emit(SessionEvent::Publication { channel, data });
                }
                Inbound::ServerSubscribed { channel } => {
                    self.emit(SessionEvent::ServerSubscribed { channel });
                }
                Inbound::Unsubscribed { channel, reason } => {
                    debug!(session = %self.config.session_id, %channel, %reason, "Unsubscribe push");
                    if subscriptions.active.remove(&channel) {
                        self.emit(SessionEvent::Unsubscribed { channel });
                    } else {
                        self.emit(SessionEvent::ServerUnsubscribed { channel });
                    }
                }
                Inbound::Disconnect { reason, reconnect } => {
                    return Some(if reconnect {
                        Exit::Lost(reason)
                    } else {
                        Exit::Terminated(reason)
                    });
                }
                Inbound::ConnectReply(_) | Inbound::Ignored => {}
            }
        }
        None
    }

    /// Unsubscribe from every active channel and close the socket.
    async fn release(&self, ws: &mut WsStream, subscriptions: &mut Subscriptions) {
        let channels: Vec<String> = subscriptions.active.drain().collect();
        for channel in channels {
            let id = subscriptions.next_command_id();
            let _ = send_command(ws, Command::unsubscribe(id, &channel)).await;
            self.emit(SessionEvent::Unsubscribed { channel });
        }
        if let Err(e) = ws.close(None).await {
            debug!(session = %self.config.session_id, error = %e, "Close handshake failed");
        }
        self.emit(SessionEvent::Disconnected {
            reason: "client closed".to_string(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        // the worker may already be gone; nothing left to tell then
        let _ = self.events.send(event);
    }
}

async fn send_command(ws: &mut WsStream, command: Command) -> Result<(), TransportError> {
    ws.send(WsMessage::text(command.to_json()?)).await?;
    Ok(())
}

/// Wait for the reply to the connect command, answering pings meanwhile.
async fn connect_reply(ws: &mut WsStream) -> Result<Accepted, TransportError> {
    while let Some(frame) = ws.next().await {
        match frame? {
            WsMessage::Text(text) => {
                for inbound in decode_frame(text.as_str()) {
                    match inbound? {
                        Inbound::ConnectReply(Ok(accepted)) => return Ok(accepted),
                        Inbound::ConnectReply(Err(e)) => {
                            return Err(TransportError::Rejected {
                                code: e.code,
                                message: e.message,
                            });
                        }
                        Inbound::Ping => ws.send(WsMessage::text("{}")).await?,
                        _ => {}
                    }
                }
            }
            WsMessage::Close(_) => return Err(TransportError::Closed),
            _ => {}
        }
    }
    Err(TransportError::Closed)
}

/// Resolves once the owner closes the connection. Subscribe requests that
/// arrive while disconnected are dropped; the worker re-subscribes on the
/// next `Connected`.
async fn closed(commands: &mut UnboundedReceiver<ClientCommand>) {
    loop {
        match commands.recv().await {
            Some(ClientCommand::Subscribe(channel)) => {
                debug!(%channel, "Dropping subscribe while disconnected");
            }
            Some(ClientCommand::Close) | None => return,
        }
    }
}
