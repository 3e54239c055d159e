//! Control request and response bodies.
//!
//! Field names are matched case-insensitively the way existing load
//! scripts send them (`Id`, `id`, `CentrifugoUrl`, ...).

use serde::{Deserialize, Serialize};

use crate::registry::Counters;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddRequest {
    #[serde(alias = "Id", alias = "ID")]
    pub id: String,
    /// Bulk add: register ids `"0".."many-1"` instead of `id`.
    #[serde(alias = "Many")]
    pub many: usize,
    #[serde(
        alias = "CentrifugoUrl",
        alias = "centrifugoUrl",
        alias = "centrifugo_url",
        alias = "BrokerUrl",
        alias = "brokerUrl"
    )]
    pub broker_url: String,
    /// Raw `Cookie` header replacing the request's own cookies.
    #[serde(alias = "Cookie")]
    pub cookie: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoveRequest {
    #[serde(alias = "Id", alias = "ID")]
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CountResponse {
    pub total: usize,
    pub connected: usize,
    pub subscribed: usize,
}

impl From<Counters> for CountResponse {
    fn from(counters: Counters) -> Self {
        Self {
            total: counters.total,
            connected: counters.connected,
            subscribed: counters.subscribed,
        }
    }
}
