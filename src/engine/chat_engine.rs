use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::ChatError;
use super::events::{ChannelInfo, ChannelMessage, ChatEvent, SessionId, Timestamp};
use super::registry::UserRegistry;
use super::store::ChannelStore;
use super::user_session::UserSession;

/// The central hub that manages all chat state. Transport-agnostic; the
/// WebSocket adapter and the REST handlers both call into this.
///
/// A channel's delivery group is its member set, mutated only by
/// enter/leave/disconnect here, so broadcasts always see the same membership
/// the session bookkeeping does.
pub struct ChatEngine {
    /// All currently connected sessions, keyed by session ID.
    sessions: DashMap<SessionId, UserSession>,
    /// Active display names.
    users: UserRegistry,
    /// All created channels and their history buffers.
    channels: ChannelStore,
}

impl ChatEngine {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            users: UserRegistry::new(),
            channels: ChannelStore::new(),
        }
    }

    /// Register a new anonymous session. Returns the session ID and the
    /// receiver the transport should drain for outbound events.
    pub fn connect(&self) -> (SessionId, mpsc::UnboundedReceiver<ChatEvent>) {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        self.sessions
            .insert(session_id, UserSession::new(session_id, tx));

        info!(%session_id, "session connected");
        (session_id, rx)
    }

    /// Bind a display name to a session. A session that signs in again under
    /// a different name first gives up its previous identity, like
    /// resubmitting the sign-in form; the new name is claimed before the old
    /// one is released, so a failed sign-in changes nothing.
    pub fn sign_in(&self, session_id: SessionId, name: &str) -> Result<(), ChatError> {
        let prior = {
            let session = self
                .sessions
                .get(&session_id)
                .ok_or(ChatError::NotAuthenticated)?;
            session.name.clone()
        };

        if prior.as_deref() == Some(name) {
            return Ok(());
        }

        self.users.sign_in(name)?;

        if let Some(old_name) = prior {
            self.leave_current_channel(session_id);
            self.users.sign_out(&old_name);
        }

        if let Some(mut session) = self.sessions.get_mut(&session_id) {
            session.name = Some(name.to_string());
        }

        info!(%session_id, %name, "signed in");
        Ok(())
    }

    /// Log a session out: leave the current channel (emitting "left") and
    /// release the display name. Idempotent.
    pub fn sign_out(&self, session_id: SessionId) {
        self.leave_current_channel(session_id);

        let name = self
            .sessions
            .get_mut(&session_id)
            .and_then(|mut session| session.name.take());

        if let Some(name) = name {
            self.users.sign_out(&name);
            info!(%session_id, %name, "signed out");
        }
    }

    /// Create a channel with an empty history buffer. Fails if the name is
    /// taken or empty; a failed create leaves the store unchanged.
    pub fn create_channel(&self, name: &str) -> Result<(), ChatError> {
        self.channels.create(name)?;
        info!(channel = %name, "channel created");
        Ok(())
    }

    /// Move a session into a channel. Leaves the previous channel first
    /// (emitting "left" there), then joins and announces "joined" to the
    /// whole room, joiner included. Re-entering the current channel is a
    /// no-op.
    pub fn enter_channel(&self, session_id: SessionId, channel_name: &str) -> Result<(), ChatError> {
        let (name, current) = {
            let session = self
                .sessions
                .get(&session_id)
                .ok_or(ChatError::NotAuthenticated)?;
            let name = session.name.clone().ok_or(ChatError::NotAuthenticated)?;
            (name, session.current_channel.clone())
        };

        if !self.channels.contains(channel_name) {
            return Err(ChatError::ChannelNotFound);
        }

        if current.as_deref() == Some(channel_name) {
            return Ok(());
        }

        self.leave_current_channel(session_id);

        if let Some(mut session) = self.sessions.get_mut(&session_id) {
            session.current_channel = Some(channel_name.to_string());
        }

        let event = ChatEvent::Joined {
            user: name.clone(),
            channel: channel_name.to_string(),
            text: format!("{} has entered the channel", name),
        };

        // Membership insert and the join announcement happen under one
        // channel guard, so no broadcast can observe a half-applied join.
        if let Some(mut channel) = self.channels.get_mut(channel_name) {
            channel.members.insert(session_id);
            self.deliver(&channel.members, &event);
        }

        info!(%session_id, user = %name, channel = %channel_name, "entered channel");
        Ok(())
    }

    /// Broadcast a chat message to the session's current channel and append
    /// it to that channel's history. The recorded current channel is trusted
    /// as-is; enter_channel is the only place membership changes.
    pub fn send_message(
        &self,
        session_id: SessionId,
        text: &str,
        timestamp: Timestamp,
    ) -> Result<(), ChatError> {
        let (name, channel_name) = {
            let session = self
                .sessions
                .get(&session_id)
                .ok_or(ChatError::NotAuthenticated)?;
            let name = session.name.clone().ok_or(ChatError::NotAuthenticated)?;
            let channel = session
                .current_channel
                .clone()
                .ok_or(ChatError::NotInChannel)?;
            (name, channel)
        };

        let message = ChannelMessage {
            timestamp: timestamp.clone(),
            user: name.clone(),
            text: text.to_string(),
        };
        let event = ChatEvent::Message {
            user: name,
            timestamp,
            text: text.to_string(),
        };

        // Append and delivery share one channel guard: concurrent senders
        // are serialized per channel, so history order matches delivery
        // order and the 100-message bound holds.
        if let Some(mut channel) = self.channels.get_mut(&channel_name) {
            channel.push_message(message);
            self.deliver(&channel.members, &event);
        }

        Ok(())
    }

    /// Tear down a session: leave its channel (emitting "left"), release its
    /// name, drop it. Transport disconnects can be reported more than once;
    /// the second call is a silent no-op.
    pub fn disconnect(&self, session_id: SessionId) {
        let Some((_, session)) = self.sessions.remove(&session_id) else {
            return;
        };

        if let Some(channel_name) = &session.current_channel {
            self.remove_and_announce(session_id, session.name.as_deref(), channel_name);
        }

        if let Some(name) = &session.name {
            self.users.sign_out(name);
        }

        info!(%session_id, "session disconnected");
    }

    /// Channel summaries in creation order.
    pub fn list_channels(&self) -> Vec<ChannelInfo> {
        self.channels.list_info()
    }

    pub fn channel_exists(&self, name: &str) -> bool {
        self.channels.contains(name)
    }

    /// Snapshot of a channel's retained messages, oldest first, for replay
    /// to a newly joined connection.
    pub fn history(&self, channel_name: &str) -> Vec<ChannelMessage> {
        self.channels.history(channel_name)
    }

    /// Send an event directly to one session (transport-level replies).
    pub fn send_to(&self, session_id: SessionId, event: ChatEvent) {
        if let Some(session) = self.sessions.get(&session_id) {
            let _ = session.send(event);
        }
    }

    /// Leave the session's current channel, if any, announcing "left" to the
    /// remaining members. Idempotent.
    fn leave_current_channel(&self, session_id: SessionId) {
        let (name, channel_name) = {
            let Some(mut session) = self.sessions.get_mut(&session_id) else {
                return;
            };
            let Some(channel) = session.current_channel.take() else {
                return;
            };
            (session.name.clone(), channel)
        };

        self.remove_and_announce(session_id, name.as_deref(), &channel_name);
    }

    /// Drop a session from a channel's delivery group and announce "left" to
    /// whoever remains, under one channel guard.
    fn remove_and_announce(&self, session_id: SessionId, name: Option<&str>, channel_name: &str) {
        let event = ChatEvent::Left {
            text: format!("{} has left the channel", name.unwrap_or_default()),
        };

        if let Some(mut channel) = self.channels.get_mut(channel_name) {
            channel.members.remove(&session_id);
            self.deliver(&channel.members, &event);
        }
    }

    /// Fan an event out to every session in a delivery group.
    fn deliver(&self, members: &HashSet<SessionId>, event: &ChatEvent) {
        for member_id in members {
            if let Some(session) = self.sessions.get(member_id) {
                if !session.send(event.clone()) {
                    warn!(%member_id, "failed to send event to session (transport closed)");
                }
            }
        }
    }
}

impl Default for ChatEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    fn signed_in(
        engine: &ChatEngine,
        name: &str,
    ) -> (SessionId, mpsc::UnboundedReceiver<ChatEvent>) {
        let (session_id, rx) = engine.connect();
        engine.sign_in(session_id, name).unwrap();
        (session_id, rx)
    }

    #[tokio::test]
    async fn test_sign_in_releases_name_on_disconnect() {
        let engine = ChatEngine::new();

        let (session_id, _rx) = engine.connect();
        engine.sign_in(session_id, "alice").unwrap();

        let (other, _rx2) = engine.connect();
        assert_eq!(engine.sign_in(other, "alice"), Err(ChatError::NameTaken));

        engine.disconnect(session_id);
        assert_eq!(engine.sign_in(other, "alice"), Ok(()));
    }

    #[tokio::test]
    async fn test_sign_in_validates_name() {
        let engine = ChatEngine::new();
        let (session_id, _rx) = engine.connect();

        assert_eq!(engine.sign_in(session_id, "a"), Err(ChatError::InvalidName));
        assert_eq!(engine.sign_in(session_id, ""), Err(ChatError::InvalidName));
    }

    #[test]
    fn test_concurrent_sign_in_single_winner() {
        let engine = Arc::new(ChatEngine::new());

        let (s1, _rx1) = engine.connect();
        let (s2, _rx2) = engine.connect();

        let e1 = engine.clone();
        let e2 = engine.clone();
        let t1 = std::thread::spawn(move || e1.sign_in(s1, "bob"));
        let t2 = std::thread::spawn(move || e2.sign_in(s2, "bob"));

        let results = [t1.join().unwrap(), t2.join().unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.contains(&Err(ChatError::NameTaken)));
    }

    #[tokio::test]
    async fn test_enter_requires_sign_in_and_existing_channel() {
        let engine = ChatEngine::new();

        let (anon, _rx) = engine.connect();
        assert_eq!(
            engine.enter_channel(anon, "general"),
            Err(ChatError::NotAuthenticated)
        );

        let (session_id, _rx) = signed_in(&engine, "alice");
        assert_eq!(
            engine.enter_channel(session_id, "general"),
            Err(ChatError::ChannelNotFound)
        );

        engine.create_channel("general").unwrap();
        engine.enter_channel(session_id, "general").unwrap();
    }

    #[tokio::test]
    async fn test_create_channel_rejects_duplicate() {
        let engine = ChatEngine::new();

        engine.create_channel("general").unwrap();
        assert_eq!(
            engine.create_channel("general"),
            Err(ChatError::ChannelExists)
        );
    }

    #[tokio::test]
    async fn test_join_announced_to_whole_room() {
        let engine = ChatEngine::new();
        engine.create_channel("general").unwrap();

        let (alice, mut alice_rx) = signed_in(&engine, "alice");
        engine.enter_channel(alice, "general").unwrap();

        match alice_rx.try_recv().unwrap() {
            ChatEvent::Joined { user, channel, text } => {
                assert_eq!(user, "alice");
                assert_eq!(channel, "general");
                assert_eq!(text, "alice has entered the channel");
            }
            other => panic!("expected Joined, got {:?}", other),
        }

        let (bob, _bob_rx) = signed_in(&engine, "bob");
        engine.enter_channel(bob, "general").unwrap();

        // alice sees bob arrive too
        match alice_rx.try_recv().unwrap() {
            ChatEvent::Joined { user, .. } => assert_eq!(user, "bob"),
            other => panic!("expected Joined, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_message_reaches_room_and_history() {
        let engine = ChatEngine::new();
        engine.create_channel("general").unwrap();

        let (alice, mut alice_rx) = signed_in(&engine, "alice");
        engine.enter_channel(alice, "general").unwrap();
        while alice_rx.try_recv().is_ok() {}

        engine.send_message(alice, "hello", json!(1000)).unwrap();

        // the sender is part of the room and receives the echo
        match alice_rx.try_recv().unwrap() {
            ChatEvent::Message { user, timestamp, text } => {
                assert_eq!(user, "alice");
                assert_eq!(timestamp, json!(1000));
                assert_eq!(text, "hello");
            }
            other => panic!("expected Message, got {:?}", other),
        }

        let history = engine.history("general");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].timestamp, json!(1000));
        assert_eq!(history[0].user, "alice");
        assert_eq!(history[0].text, "hello");
    }

    #[tokio::test]
    async fn test_send_without_channel_fails() {
        let engine = ChatEngine::new();

        let (anon, _rx) = engine.connect();
        assert_eq!(
            engine.send_message(anon, "hi", json!(1)),
            Err(ChatError::NotAuthenticated)
        );

        let (alice, _rx) = signed_in(&engine, "alice");
        assert_eq!(
            engine.send_message(alice, "hi", json!(1)),
            Err(ChatError::NotInChannel)
        );
    }

    #[tokio::test]
    async fn test_switch_channel_emits_left_then_joined() {
        let engine = ChatEngine::new();
        engine.create_channel("red").unwrap();
        engine.create_channel("blue").unwrap();

        let (watcher_red, mut red_rx) = signed_in(&engine, "carol");
        engine.enter_channel(watcher_red, "red").unwrap();
        let (watcher_blue, mut blue_rx) = signed_in(&engine, "dave");
        engine.enter_channel(watcher_blue, "blue").unwrap();

        let (alice, _alice_rx) = signed_in(&engine, "alice");
        engine.enter_channel(alice, "red").unwrap();

        while red_rx.try_recv().is_ok() {}
        while blue_rx.try_recv().is_ok() {}

        engine.enter_channel(alice, "blue").unwrap();

        // exactly one "left" in red
        match red_rx.try_recv().unwrap() {
            ChatEvent::Left { text } => assert_eq!(text, "alice has left the channel"),
            other => panic!("expected Left, got {:?}", other),
        }
        assert!(red_rx.try_recv().is_err());

        // exactly one "joined" in blue
        match blue_rx.try_recv().unwrap() {
            ChatEvent::Joined { user, channel, .. } => {
                assert_eq!(user, "alice");
                assert_eq!(channel, "blue");
            }
            other => panic!("expected Joined, got {:?}", other),
        }
        assert!(blue_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reentering_current_channel_is_noop() {
        let engine = ChatEngine::new();
        engine.create_channel("general").unwrap();

        let (alice, _alice_rx) = signed_in(&engine, "alice");
        engine.enter_channel(alice, "general").unwrap();

        let (bob, mut bob_rx) = signed_in(&engine, "bob");
        engine.enter_channel(bob, "general").unwrap();
        while bob_rx.try_recv().is_ok() {}

        engine.enter_channel(alice, "general").unwrap();

        // no second join announcement, no spurious leave
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let engine = ChatEngine::new();
        engine.create_channel("general").unwrap();

        let (alice, _alice_rx) = signed_in(&engine, "alice");
        engine.enter_channel(alice, "general").unwrap();
        let (bob, mut bob_rx) = signed_in(&engine, "bob");
        engine.enter_channel(bob, "general").unwrap();

        while bob_rx.try_recv().is_ok() {}

        engine.disconnect(alice);
        match bob_rx.try_recv().unwrap() {
            ChatEvent::Left { text } => assert_eq!(text, "alice has left the channel"),
            other => panic!("expected Left, got {:?}", other),
        }

        // reporting the same disconnect again produces nothing
        engine.disconnect(alice);
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_sign_out_returns_session_to_anonymous() {
        let engine = ChatEngine::new();
        engine.create_channel("general").unwrap();

        let (alice, mut alice_rx) = signed_in(&engine, "alice");
        engine.enter_channel(alice, "general").unwrap();
        while alice_rx.try_recv().is_ok() {}

        engine.sign_out(alice);
        // calling again is harmless
        engine.sign_out(alice);

        assert_eq!(
            engine.send_message(alice, "hi", json!(1)),
            Err(ChatError::NotAuthenticated)
        );

        // the name is free again
        let (other, _rx) = engine.connect();
        engine.sign_in(other, "alice").unwrap();
    }

    #[tokio::test]
    async fn test_list_channels_in_creation_order() {
        let engine = ChatEngine::new();
        engine.create_channel("zebra").unwrap();
        engine.create_channel("alpha").unwrap();

        let (alice, _rx) = signed_in(&engine, "alice");
        engine.enter_channel(alice, "alpha").unwrap();

        let channels = engine.list_channels();
        let names: Vec<&str> = channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["zebra", "alpha"]);
        assert_eq!(channels[0].member_count, 0);
        assert_eq!(channels[1].member_count, 1);
    }
}
