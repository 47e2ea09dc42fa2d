use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::events::{ChatEvent, SessionId};

/// Per-connection state. A session is anonymous until a display name is
/// bound to it, and is in at most one channel at a time.
#[derive(Debug)]
pub struct UserSession {
    pub id: SessionId,
    /// Display name, set on sign-in.
    pub name: Option<String>,
    /// The channel this session is currently in, if any. Always references
    /// an existing channel.
    pub current_channel: Option<String>,
    /// Send outbound events to this session's write loop.
    pub outbound: mpsc::UnboundedSender<ChatEvent>,
    pub connected_at: DateTime<Utc>,
}

impl UserSession {
    pub fn new(id: SessionId, outbound: mpsc::UnboundedSender<ChatEvent>) -> Self {
        Self {
            id,
            name: None,
            current_channel: None,
            outbound,
            connected_at: Utc::now(),
        }
    }

    /// Send an event to this session. Returns false if the transport side
    /// is gone.
    pub fn send(&self, event: ChatEvent) -> bool {
        self.outbound.send(event).is_ok()
    }
}
