//! Control intents
//!
//! `ControlApi` is what the outside world can ask of the session pool, with
//! no knowledge of HTTP. Requests are validated here, before the registry is
//! touched; a rejected request never changes state.

use std::fmt;

use tracing::info;
use url::Url;

use super::request::AddRequest;
use crate::registry::{Counters, SessionRegistry};
use crate::utils::error::ValidationError;
use crate::worker::cookies::{Cookie, parse_cookie_header};
use crate::worker::endpoint::http_origin;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddResult {
    Added { broker_url: String },
    AlreadyExists,
}

/// Result of adding one id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    pub id: String,
    pub result: AddResult,
}

impl fmt::Display for AddOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            AddResult::Added { broker_url } => write!(f, "User {} is added to {}", self.id, broker_url),
            AddResult::AlreadyExists => write!(f, "User {} is already exists", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(String),
    NotExists(String),
}

impl fmt::Display for RemoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoveOutcome::Removed(id) => write!(f, "User {id} is removed"),
            RemoveOutcome::NotExists(id) => write!(f, "User {id} is not exists"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlApi {
    registry: SessionRegistry,
    default_broker_url: Option<String>,
}

impl ControlApi {
    /// `default_broker_url` is used when a request names none; pass an empty
    /// string to require one on every request.
    pub fn new(registry: SessionRegistry, default_broker_url: impl Into<String>) -> Self {
        let default_broker_url = Some(default_broker_url.into()).filter(|u| !u.is_empty());
        Self {
            registry,
            default_broker_url,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Add one session, or `many` sessions with ids `"0".."many-1"`.
    ///
    /// Bulk adds are best-effort: ids that already exist are reported as such
    /// and the rest are still added.
    pub fn add_sessions(
        &self,
        request: &AddRequest,
        request_cookies: Vec<Cookie>,
    ) -> Result<Vec<AddOutcome>, ValidationError> {
        if request.id.is_empty() && request.many == 0 {
            return Err(ValidationError::MissingId);
        }

        let broker_url = self.resolve_broker_url(&request.broker_url)?;

        let cookies = if request.cookie.is_empty() {
            request_cookies
        } else {
            parse_cookie_header(&request.cookie)
        };
        if cookies.is_empty() {
            return Err(ValidationError::MissingCookies);
        }

        let ids: Vec<String> = if request.many > 0 {
            (0..request.many).map(|i| i.to_string()).collect()
        } else {
            vec![request.id.clone()]
        };

        let outcomes = ids
            .into_iter()
            .map(|id| {
                let result = if self.registry.add(&id, &broker_url, &cookies) {
                    AddResult::Added {
                        broker_url: broker_url.to_string(),
                    }
                } else {
                    AddResult::AlreadyExists
                };
                let outcome = AddOutcome { id, result };
                info!("{outcome}");
                outcome
            })
            .collect();
        Ok(outcomes)
    }

    pub fn remove_session(&self, id: &str) -> Result<RemoveOutcome, ValidationError> {
        if id.is_empty() {
            return Err(ValidationError::MissingId);
        }

        let outcome = if self.registry.remove(id) {
            RemoveOutcome::Removed(id.to_string())
        } else {
            RemoveOutcome::NotExists(id.to_string())
        };
        info!("{outcome}");
        Ok(outcome)
    }

    pub fn remove_all(&self) -> usize {
        self.registry.remove_all()
    }

    pub fn counts(&self) -> Counters {
        self.registry.counters()
    }

    /// Pick the request's broker URL over the default and normalize it to
    /// its HTTP origin form.
    fn resolve_broker_url(&self, requested: &str) -> Result<Url, ValidationError> {
        let raw = if requested.is_empty() {
            self.default_broker_url.as_deref().unwrap_or_default()
        } else {
            requested
        };
        if raw.is_empty() {
            return Err(ValidationError::MissingBrokerUrl);
        }

        let url = Url::parse(raw).map_err(|source| ValidationError::InvalidBrokerUrl {
            url: raw.to_string(),
            source,
        })?;
        match url.scheme() {
            "http" | "https" | "ws" | "wss" => Ok(http_origin(&url)),
            other => Err(ValidationError::UnsupportedScheme(other.to_string())),
        }
    }
}
