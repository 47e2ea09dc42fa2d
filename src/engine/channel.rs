use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};

use super::events::{ChannelMessage, SessionId};

/// Maximum number of messages retained per channel.
pub const HISTORY_CAPACITY: usize = 100;

/// In-memory state for a single channel. Channels are created on demand and
/// live for the rest of the process.
#[derive(Debug)]
pub struct ChannelState {
    pub name: String,
    /// Session IDs of currently connected members. This set IS the
    /// channel's broadcast delivery group.
    pub members: HashSet<SessionId>,
    /// Retained messages, oldest first. Length never exceeds
    /// HISTORY_CAPACITY.
    pub history: VecDeque<ChannelMessage>,
    pub created_at: DateTime<Utc>,
}

impl ChannelState {
    pub fn new(name: String) -> Self {
        Self {
            name,
            members: HashSet::new(),
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            created_at: Utc::now(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Append a message, evicting the oldest entry when at capacity.
    pub fn push_message(&mut self, message: ChannelMessage) {
        if self.history.len() >= HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(message);
    }
}
