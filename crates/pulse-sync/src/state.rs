//! Sync connection state machine.

use serde::{Deserialize, Serialize};

/// Connection state of the push channel.
///
/// `disconnected → connecting → connected → disconnected` with a
/// linear-backoff retry loop; after the attempt cap the client stays
/// `disconnected` and relies on polling until a manual reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No push connection; polling fallback is active.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// Push events are flowing.
    Connected,
}

impl ConnectionState {
    /// Return the state as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
