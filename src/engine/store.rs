use std::sync::Mutex;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::{Ref, RefMut};

use super::channel::ChannelState;
use super::error::ChatError;
use super::events::{ChannelInfo, ChannelMessage};
use super::validation;

/// Tracks the set of created channels and each channel's bounded history.
/// Channels are never destroyed.
#[derive(Debug, Default)]
pub struct ChannelStore {
    channels: DashMap<String, ChannelState>,
    /// Channel names in creation order, for display.
    order: Mutex<Vec<String>>,
}

impl ChannelStore {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            order: Mutex::new(Vec::new()),
        }
    }

    /// Create a channel. The existence check and the insert are one atomic
    /// entry operation; a failed create leaves the store unchanged.
    pub fn create(&self, name: &str) -> Result<(), ChatError> {
        validation::validate_channel_name(name)?;
        match self.channels.entry(name.to_string()) {
            Entry::Occupied(_) => Err(ChatError::ChannelExists),
            Entry::Vacant(slot) => {
                slot.insert(ChannelState::new(name.to_string()));
                self.order.lock().unwrap().push(name.to_string());
                Ok(())
            }
        }
    }

    /// Channel names in creation order.
    pub fn list(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }

    /// Channel summaries in creation order.
    pub fn list_info(&self) -> Vec<ChannelInfo> {
        self.list()
            .into_iter()
            .filter_map(|name| {
                self.channels.get(&name).map(|ch| ChannelInfo {
                    member_count: ch.member_count(),
                    name,
                })
            })
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Ref<'_, String, ChannelState>> {
        self.channels.get(name)
    }

    /// Exclusive handle to a channel. Holding it serializes membership
    /// changes, history appends, and broadcasts for that channel, and that
    /// channel only.
    pub fn get_mut(&self, name: &str) -> Option<RefMut<'_, String, ChannelState>> {
        self.channels.get_mut(name)
    }

    /// Append a message to a channel's history, evicting the oldest entry
    /// past capacity. Silent no-op for an unknown channel; callers ensure
    /// the channel exists.
    pub fn append_message(&self, channel: &str, message: ChannelMessage) {
        if let Some(mut ch) = self.channels.get_mut(channel) {
            ch.push_message(message);
        }
    }

    /// Snapshot of a channel's history, oldest first. Empty for an unknown
    /// channel.
    pub fn history(&self, channel: &str) -> Vec<ChannelMessage> {
        self.channels
            .get(channel)
            .map(|ch| ch.history.iter().cloned().collect())
            .unwrap_or_default()
    }
}
