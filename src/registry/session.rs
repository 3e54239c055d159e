//! Session records
//!
//! A `Session` is the registry's view of one simulated user: its id, the
//! cancellation token of its worker, and two status flags mirrored from the
//! worker's connection. The flags are eventually consistent with the
//! transport, never transactional with it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub type SessionId = String;

#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    generation: u64,
    cancel: CancellationToken,
    created_at: DateTime<Utc>,
    pub(crate) is_connected: bool,
    pub(crate) is_subscribed: bool,
}

impl Session {
    pub(crate) fn new(id: SessionId, generation: u64, cancel: CancellationToken) -> Self {
        Self {
            id,
            generation,
            cancel,
            created_at: Utc::now(),
            is_connected: false,
            is_subscribed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Distinguishes successive sessions registered under the same id.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn is_subscribed(&self) -> bool {
        self.is_subscribed
    }

    /// True once the session's worker has been told to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Signal the worker. Idempotent and never blocks.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Point-in-time totals over every registered session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub total: usize,
    pub connected: usize,
    pub subscribed: usize,
}

impl Counters {
    pub(crate) fn tally<'a>(sessions: impl ExactSizeIterator<Item = &'a Session>) -> Self {
        let mut counters = Counters {
            total: sessions.len(),
            ..Counters::default()
        };
        for session in sessions {
            if session.is_connected {
                counters.connected += 1;
            }
            if session.is_subscribed {
                counters.subscribed += 1;
            }
        }
        counters
    }
}

/// A status flag a worker mirrors into its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFlag {
    Connected,
    Subscribed,
}
