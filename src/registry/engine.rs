//! Registry engine
//!
//! `SessionRegistry` owns the map of live sessions and their cancellation
//! tokens. It is responsible for:
//! - inserting a session and spawning its worker atomically, so no id ever
//!   has two workers
//! - removing sessions and cancelling their workers, one at a time or in a
//!   single sweep
//! - applying status updates reported by workers
//! - producing consistent counters snapshots
//!
//! Concurrency notes:
//! - Every operation takes one `parking_lot::Mutex` and never awaits while
//!   holding it. Cancelling a worker is a token flip, so removal cannot
//!   stall on a worker that already exited or never started waiting.
//! - Status updates for ids that are no longer present are dropped. Workers
//!   tag their updates with the session generation, so a worker that lost a
//!   race with `remove` cannot touch a session re-added under the same id.
//! - `add` spawns onto the current tokio runtime and must be called from
//!   within one.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::session::{Counters, Session, SessionId, StatusFlag};
use crate::worker::{Connector, Cookie, SessionWorker, WorkerSetup};

/// Thread-safe store of live sessions. Cheap to clone.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
    connector: Arc<dyn Connector>,
    next_generation: Arc<AtomicU64>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.lock().len())
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            connector,
            next_generation: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register `id` and start its worker.
    ///
    /// Returns false, without side effects, when the id is already present.
    pub fn add(&self, id: &str, broker_url: &Url, cookies: &[Cookie]) -> bool {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(id) {
            return false;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        sessions.insert(
            id.to_string(),
            Session::new(id.to_string(), generation, cancel.clone()),
        );

        let worker = SessionWorker::new(id.to_string(), generation, self.clone());
        let setup = WorkerSetup {
            broker_url: broker_url.clone(),
            cookies: cookies.to_vec(),
        };
        tokio::spawn(worker.run(setup, self.connector.clone(), cancel));

        debug!(session = %id, generation, "Session registered");
        true
    }

    /// Cancel the worker of `id` and forget the session.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.lock().remove(id);
        match removed {
            Some(session) => {
                session.cancel();
                let age = Utc::now().signed_duration_since(session.created_at());
                debug!(session = %id, age_secs = age.num_seconds(), "Session removed");
                true
            }
            None => false,
        }
    }

    /// Cancel and remove every session in one sweep. Returns how many were removed.
    pub fn remove_all(&self) -> usize {
        let mut sessions = self.sessions.lock();
        let removed = sessions.len();
        for (_, session) in sessions.drain() {
            session.cancel();
        }
        drop(sessions);

        info!(removed, "Sessions cleaned");
        removed
    }

    pub fn set_connected(&self, id: &str, connected: bool) {
        self.update_status(id, None, StatusFlag::Connected, connected);
    }

    pub fn set_subscribed(&self, id: &str, subscribed: bool) {
        self.update_status(id, None, StatusFlag::Subscribed, subscribed);
    }

    /// Apply a status update. With a `generation`, the update only applies
    /// to that exact registration of `id`.
    pub(crate) fn update_status(
        &self,
        id: &str,
        generation: Option<u64>,
        flag: StatusFlag,
        value: bool,
    ) {
        let mut sessions = self.sessions.lock();
        let Some(session) = sessions.get_mut(id) else {
            return;
        };
        if generation.is_some_and(|g| g != session.generation()) {
            return;
        }
        match flag {
            StatusFlag::Connected => session.is_connected = value,
            StatusFlag::Subscribed => session.is_subscribed = value,
        }
    }

    pub fn counters(&self) -> Counters {
        Counters::tally(self.sessions.lock().values())
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
