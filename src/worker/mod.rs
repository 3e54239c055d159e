//! Session workers
//!
//! One worker runs per registered session. It starts a realtime client
//! through a [`Connector`], subscribes to the session's private channel
//! whenever the client connects, mirrors connection and subscription status
//! into the registry, and tears the client down when its cancellation token
//! fires. Cancellation is the only way a worker exits once its setup
//! succeeded; transport and subscription errors only move status flags.

pub mod connector;
pub mod cookies;
pub mod endpoint;
pub mod event;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

pub use connector::{ClientCommand, ClientConfig, ConnectionHandle, Connector, EventSender};
pub use cookies::{Cookie, CookieJar};
pub use event::SessionEvent;

use crate::registry::{SessionId, SessionRegistry, StatusFlag};
use crate::utils::error::SetupError;

/// Inputs a worker needs to build its client configuration.
#[derive(Debug, Clone)]
pub struct WorkerSetup {
    pub broker_url: Url,
    pub cookies: Vec<Cookie>,
}

impl WorkerSetup {
    /// Resolve the realtime endpoint and the cookie header for `session_id`.
    pub fn client_config(&self, session_id: &str) -> Result<ClientConfig, SetupError> {
        let endpoint = endpoint::realtime_endpoint(&self.broker_url)?;
        let jar = CookieJar::new(&self.broker_url, &self.cookies)?;
        debug!(session = %session_id, origin = %jar.origin(), %endpoint, "Client configured");
        Ok(ClientConfig {
            session_id: session_id.to_string(),
            endpoint,
            cookie_header: jar.header_value()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Init,
    Connecting,
    Connected,
    Subscribing,
    Subscribed,
    Terminating,
}

pub struct SessionWorker {
    id: SessionId,
    generation: u64,
    channel: String,
    registry: SessionRegistry,
    state: WorkerState,
}

impl SessionWorker {
    pub(crate) fn new(id: SessionId, generation: u64, registry: SessionRegistry) -> Self {
        let channel = endpoint::private_channel(&id);
        Self {
            id,
            generation,
            channel,
            registry,
            state: WorkerState::Init,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub async fn run(
        mut self,
        setup: WorkerSetup,
        connector: Arc<dyn Connector>,
        cancel: CancellationToken,
    ) {
        let config = match setup.client_config(&self.id) {
            Ok(config) => config,
            Err(e) => {
                error!(session = %self.id, error = %e, "Session setup failed");
                return;
            }
        };

        if cancel.is_cancelled() {
            info!(session = %self.id, "User exit before connecting");
            return;
        }

        let (events_tx, mut events) = mpsc::unbounded_channel();
        let connection = connector.connect(config, events_tx);
        self.transition(WorkerState::Connecting);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event, &connection),
                    None => {
                        // client gave up for good; only cancellation remains
                        cancel.cancelled().await;
                        break;
                    }
                },
            }
        }

        self.transition(WorkerState::Terminating);
        connection.close().await;
        info!(session = %self.id, "User exit");
    }

    pub(crate) fn handle_event(&mut self, event: SessionEvent, connection: &ConnectionHandle) {
        match event {
            SessionEvent::Connected { client_id } => {
                info!(session = %self.id, client = ?client_id, "Connected");
                self.report(StatusFlag::Connected, true);
                self.transition(WorkerState::Connected);

                if connection.subscribe(&self.channel) {
                    self.transition(WorkerState::Subscribing);
                } else {
                    warn!(session = %self.id, channel = %self.channel, "Realtime client is gone, can't subscribe");
                }
            }
            SessionEvent::Disconnected { reason } => {
                info!(session = %self.id, %reason, "Disconnected");
                self.report(StatusFlag::Connected, false);
                self.transition(WorkerState::Connecting);
            }
            SessionEvent::Error { message } => {
                warn!(session = %self.id, %message, "Connection error");
                self.report(StatusFlag::Connected, false);
                self.transition(WorkerState::Connecting);
            }
            SessionEvent::ServerSubscribed { channel } => {
                info!(session = %self.id, %channel, "Subscribed to server-side channel");
            }
            SessionEvent::ServerUnsubscribed { channel } => {
                info!(session = %self.id, %channel, "Unsubscribed from server-side channel");
            }
            SessionEvent::Subscribed { channel } => {
                if channel != self.channel {
                    debug!(session = %self.id, %channel, "Ignoring subscription to foreign channel");
                    return;
                }
                info!(session = %self.id, %channel, "Subscribed to private channel");
                self.report(StatusFlag::Subscribed, true);
                self.transition(WorkerState::Subscribed);
            }
            SessionEvent::SubscribeError { channel, message } => {
                warn!(session = %self.id, %channel, %message, "Error subscribing to private channel");
                if channel == self.channel {
                    self.report(StatusFlag::Subscribed, false);
                    if self.state == WorkerState::Subscribing {
                        self.transition(WorkerState::Connected);
                    }
                }
            }
            SessionEvent::Unsubscribed { channel } => {
                info!(session = %self.id, %channel, "Unsubscribed from private channel");
                if channel == self.channel {
                    self.report(StatusFlag::Subscribed, false);
                    if self.state == WorkerState::Subscribed {
                        self.transition(WorkerState::Connected);
                    }
                }
            }
            SessionEvent::Publication { channel, data } => {
                info!(session = %self.id, %channel, %data, "Received message");
            }
        }
    }

    fn report(&self, flag: StatusFlag, value: bool) {
        self.registry
            .update_status(&self.id, Some(self.generation), flag, value);
    }

    fn transition(&mut self, next: WorkerState) {
        if self.state != next {
            debug!(session = %self.id, from = ?self.state, to = ?next, "Worker state changed");
            self.state = next;
        }
    }
}
