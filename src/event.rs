#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// Notifications from the feed task to whoever is presenting the session.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Status(WsConnectionStatus),
    TickRejected { reason: String },
    LogMessage(String),
    Error(String),
}
