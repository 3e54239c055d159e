//! Realtime protocol frames
//!
//! JSON framing of the Centrifugo client protocol, limited to what a
//! subscribing session needs: connect, subscribe and unsubscribe commands
//! going out; replies, pushes and pings coming in. One websocket text frame
//! may carry several newline-delimited replies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command id of the connect handshake; later commands count up from here.
pub const CONNECT_COMMAND_ID: u32 = 1;

#[derive(Debug, Serialize)]
pub struct Command {
    pub id: u32,
    #[serde(flatten)]
    pub method: CommandMethod,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandMethod {
    Connect { name: String },
    Subscribe { channel: String },
    Unsubscribe { channel: String },
}

impl Command {
    pub fn connect(name: &str) -> Self {
        Self {
            id: CONNECT_COMMAND_ID,
            method: CommandMethod::Connect {
                name: name.to_string(),
            },
        }
    }

    pub fn subscribe(id: u32, channel: &str) -> Self {
        Self {
            id,
            method: CommandMethod::Subscribe {
                channel: channel.to_string(),
            },
        }
    }

    pub fn unsubscribe(id: u32, channel: &str) -> Self {
        Self {
            id,
            method: CommandMethod::Unsubscribe {
                channel: channel.to_string(),
            },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Raw reply as sent by the broker. Every field is optional on the wire.
#[derive(Debug, Default, Deserialize)]
pub struct Reply {
    #[serde(default)]
    pub id: u32,
    pub error: Option<ReplyError>,
    pub connect: Option<ConnectResult>,
    pub subscribe: Option<Value>,
    pub unsubscribe: Option<Value>,
    pub push: Option<Push>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReplyError {
    pub code: u32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConnectResult {
    pub client: Option<String>,
    pub version: Option<String>,
    /// Server-side subscriptions granted with the connection, keyed by channel.
    #[serde(default)]
    pub subs: BTreeMap<String, Value>,
}

/// A successful connect handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accepted {
    pub client_id: Option<String>,
    pub server_channels: Vec<String>,
}

impl From<ConnectResult> for Accepted {
    fn from(result: ConnectResult) -> Self {
        Self {
            client_id: result.client,
            server_channels: result.subs.into_keys().collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Push {
    #[serde(default)]
    pub channel: String,
    #[serde(rename = "pub")]
    pub publication: Option<Publication>,
    pub subscribe: Option<Value>,
    pub unsubscribe: Option<UnsubscribePush>,
    pub disconnect: Option<DisconnectPush>,
}

#[derive(Debug, Deserialize)]
pub struct Publication {
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct UnsubscribePush {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DisconnectPush {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub reason: String,
    #[serde(default = "default_reconnect")]
    pub reconnect: bool,
}

fn default_reconnect() -> bool {
    true
}

/// A decoded incoming frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Empty frame; the broker expects an empty frame back.
    Ping,
    ConnectReply(Result<Accepted, ReplyError>),
    /// Reply to a subscribe or unsubscribe command.
    CommandReply { id: u32, error: Option<ReplyError> },
    Publication { channel: String, data: String },
    ServerSubscribed { channel: String },
    Unsubscribed { channel: String, reason: String },
    Disconnect { reason: String, reconnect: bool },
    /// Anything this client has no use for.
    Ignored,
}

impl From<Reply> for Inbound {
    fn from(reply: Reply) -> Self {
        if let Some(push) = reply.push {
            return push.into();
        }
        if reply.id == CONNECT_COMMAND_ID {
            return Inbound::ConnectReply(match reply.error {
                Some(error) => Err(error),
                None => Ok(reply.connect.map(Accepted::from).unwrap_or_default()),
            });
        }
        if reply.id != 0 {
            return Inbound::CommandReply {
                id: reply.id,
                error: reply.error,
            };
        }
        if reply.error.is_none()
            && reply.connect.is_none()
            && reply.subscribe.is_none()
            && reply.unsubscribe.is_none()
        {
            return Inbound::Ping;
        }
        Inbound::Ignored
    }
}

impl From<Push> for Inbound {
    fn from(push: Push) -> Self {
        let channel = push.channel;
        if let Some(publication) = push.publication {
            let data = match publication.data {
                Value::String(s) => s,
                other => other.to_string(),
            };
            return Inbound::Publication { channel, data };
        }
        if push.subscribe.is_some() {
            return Inbound::ServerSubscribed { channel };
        }
        if let Some(unsubscribe) = push.unsubscribe {
            return Inbound::Unsubscribed {
                channel,
                reason: unsubscribe.reason,
            };
        }
        if let Some(disconnect) = push.disconnect {
            return Inbound::Disconnect {
                reason: disconnect.reason,
                reconnect: disconnect.reconnect,
            };
        }
        Inbound::Ignored
    }
}

/// Decode every reply carried by one text frame.
pub fn decode_frame(text: &str) -> Vec<Result<Inbound, serde_json::Error>> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.is_empty() {
        // a bare empty frame is a ping too
        return vec![Ok(Inbound::Ping)];
    }
    lines
        .into_iter()
        .map(|line| serde_json::from_str::<Reply>(line).map(Inbound::from))
        .collect()
}
