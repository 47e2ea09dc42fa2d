use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique identifier for a connected session (one per connection, not per user).
pub type SessionId = Uuid;

/// Client-supplied message timestamp. The server never interprets it; it is
/// stored with the message and echoed back verbatim.
pub type Timestamp = Value;

/// Event that flows out of the chat engine to a session's transport.
/// The transport serializes these as tagged JSON frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A user entered a channel. Delivered to the whole room, joiner included.
    Joined {
        user: String,
        channel: String,
        text: String,
    },

    /// A user left a channel. Delivered to the remaining members.
    Left { text: String },

    /// A chat message broadcast to a channel, sender included.
    Message {
        user: String,
        timestamp: Timestamp,
        text: String,
    },

    /// Sign-in acknowledgement for the initiating session.
    SignedIn { user: String },

    /// Channel-creation acknowledgement for the initiating session.
    ChannelCreated { channel: String },

    /// History replay for a channel, oldest first.
    History {
        channel: String,
        messages: Vec<ChannelMessage>,
    },

    /// Response to a channel list request.
    ChannelList { channels: Vec<ChannelInfo> },

    /// A failed command, reported to the initiating session.
    Error { code: String, message: String },
}

/// One retained chat message in a channel's history buffer. Immutable once
/// appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub timestamp: Timestamp,
    pub user: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub name: String,
    pub member_count: usize,
}
