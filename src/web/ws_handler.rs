use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::engine::chat_engine::ChatEngine;
use crate::engine::events::{ChatEvent, SessionId, Timestamp};

use super::app_state::AppState;

/// Client-to-server WebSocket message types.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    SignIn { name: String },
    SignOut,
    CreateChannel { name: String },
    EnterChannel { channel: String },
    SendMessage { text: String, timestamp: Timestamp },
    ListChannels,
    FetchHistory { channel: String },
}

pub async fn ws_upgrade(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let engine = state.engine.clone();
    ws.on_upgrade(move |socket| handle_ws_connection(socket, engine))
}

async fn handle_ws_connection(socket: WebSocket, engine: Arc<ChatEngine>) {
    // Register this connection as an anonymous session; the client signs in
    // over the socket.
    let (session_id, mut event_rx) = engine.connect();

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Spawn write loop: engine events -> WebSocket frames
    let write_handle = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "failed to serialize event");
                }
            }
        }
    });

    // Read loop: WebSocket frames -> engine commands
    while let Some(msg_result) = ws_receiver.next().await {
        let msg = match msg_result {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "WebSocket read error");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                handle_client_message(&engine, session_id, &text);
            }
            Message::Close(_) => break,
            _ => {} // Ignore binary, ping, pong (axum handles ping/pong)
        }
    }

    // Clean up
    engine.disconnect(session_id);
    write_handle.abort();
    info!(%session_id, "WebSocket connection closed");
}

fn handle_client_message(engine: &ChatEngine, session_id: SessionId, text: &str) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "invalid client message");
            return;
        }
    };

    let result = match msg {
        ClientMessage::SignIn { name } => engine.sign_in(session_id, &name).map(|()| {
            engine.send_to(session_id, ChatEvent::SignedIn { user: name });
        }),
        ClientMessage::SignOut => {
            engine.sign_out(session_id);
            Ok(())
        }
        ClientMessage::CreateChannel { name } => engine.create_channel(&name).map(|()| {
            engine.send_to(session_id, ChatEvent::ChannelCreated { channel: name });
        }),
        ClientMessage::EnterChannel { channel } => {
            engine.enter_channel(session_id, &channel).map(|()| {
                // replay recent messages to the newly joined connection
                let messages = engine.history(&channel);
                engine.send_to(session_id, ChatEvent::History { channel, messages });
            })
        }
        ClientMessage::SendMessage { text, timestamp } => {
            engine.send_message(session_id, &text, timestamp)
        }
        ClientMessage::ListChannels => {
            engine.send_to(
                session_id,
                ChatEvent::ChannelList {
                    channels: engine.list_channels(),
                },
            );
            Ok(())
        }
        ClientMessage::FetchHistory { channel } => {
            if engine.channel_exists(&channel) {
                let messages = engine.history(&channel);
                engine.send_to(session_id, ChatEvent::History { channel, messages });
                Ok(())
            } else {
                Err(crate::engine::error::ChatError::ChannelNotFound)
            }
        }
    };

    if let Err(e) = result {
        warn!(%session_id, error = %e, "command failed");
        engine.send_to(
            session_id,
            ChatEvent::Error {
                code: e.code().into(),
                message: e.to_string(),
            },
        );
    }
}
