/// Everything a realtime client can report about one session.
///
/// Connection-level and subscription-level notifications share one enum so
/// a worker handles them in a single place.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Transport established and the broker accepted the connect command.
    Connected { client_id: Option<String> },
    /// Transport lost or closed.
    Disconnected { reason: String },
    /// Connection attempt failed; the client keeps retrying on its own.
    Error { message: String },
    /// The broker subscribed the client to a channel on its own.
    ServerSubscribed { channel: String },
    /// The broker removed a server-side subscription.
    ServerUnsubscribed { channel: String },
    Subscribed { channel: String },
    SubscribeError { channel: String, message: String },
    Unsubscribed { channel: String },
    Publication { channel: String, data: String },
}
