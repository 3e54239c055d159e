//! Test doubles shared by the unit tests of several modules.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use url::Url;

use crate::worker::{
    ClientCommand, ClientConfig, ConnectionHandle, Connector, EventSender, SessionEvent,
};

/// What the mock saw for one session id.
#[derive(Debug, Default)]
struct MockLink {
    events: Option<EventSender>,
    connects: usize,
    subscriptions: Vec<String>,
    closed: bool,
    endpoint: Option<Url>,
    cookie_header: Option<String>,
}

/// In-memory `Connector` recording commands and letting tests inject events.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    links: Arc<Mutex<HashMap<String, MockLink>>>,
}

impl MockConnector {
    /// Deliver `event` to the live worker of `id`. False if there is none.
    pub fn emit(&self, id: &str, event: SessionEvent) -> bool {
        let links = self.links.lock();
        match links.get(id).and_then(|l| l.events.as_ref()) {
            Some(events) => events.send(event).is_ok(),
            None => false,
        }
    }

    pub fn connects(&self, id: &str) -> usize {
        self.links.lock().get(id).map_or(0, |l| l.connects)
    }

    pub fn total_connects(&self) -> usize {
        self.links.lock().values().map(|l| l.connects).sum()
    }

    pub fn subscriptions(&self, id: &str) -> Vec<String> {
        self.links
            .lock()
            .get(id)
            .map(|l| l.subscriptions.clone())
            .unwrap_or_default()
    }

    pub fn is_closed(&self, id: &str) -> bool {
        self.links.lock().get(id).is_some_and(|l| l.closed)
    }

    pub fn endpoint(&self, id: &str) -> Option<Url> {
        self.links.lock().get(id).and_then(|l| l.endpoint.clone())
    }

    pub fn cookie_header(&self, id: &str) -> Option<String> {
        self.links.lock().get(id).and_then(|l| l.cookie_header.clone())
    }

    /// Simulate a successful connect followed by a successful subscription.
    pub async fn connect_and_subscribe(&self, id: &str) {
        assert!(eventually(|| self.connects(id) > 0).await, "{id} never connected");
        let already = self.subscriptions(id).len();
        assert!(self.emit(id, SessionEvent::Connected { client_id: None }));
        assert!(
            eventually(|| self.subscriptions(id).len() > already).await,
            "{id} never subscribed"
        );
        let channel = format!("#{id}");
        assert!(self.emit(id, SessionEvent::Subscribed { channel }));
    }
}

impl Connector for MockConnector {
    fn connect(&self, config: ClientConfig, events: EventSender) -> ConnectionHandle {
        let id = config.session_id.clone();
        {
            let mut links = self.links.lock();
            let link = links.entry(id.clone()).or_default();
            link.events = Some(events);
            link.connects += 1;
            link.closed = false;
            link.endpoint = Some(config.endpoint.clone());
            link.cookie_header = config.cookie_header.to_str().ok().map(str::to_string);
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let links = self.links.clone();
        let task = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                let mut links = links.lock();
                let Some(link) = links.get_mut(&id) else {
                    break;
                };
                match command {
                    ClientCommand::Subscribe(channel) => link.subscriptions.push(channel),
                    ClientCommand::Close => {
                        link.closed = true;
                        link.events = None;
                        break;
                    }
                }
            }
        });
        ConnectionHandle::new(tx, task)
    }
}

/// Poll `condition` for up to two seconds.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
