use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::engine::error::ChatError;
use crate::engine::events::ChannelMessage;

use super::app_state::AppState;

#[derive(Deserialize)]
pub struct CreateChannelRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub channel: String,
    pub messages: Vec<ChannelMessage>,
}

/// GET /api/channels - channel list in creation order, with member counts.
pub async fn get_channels(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.list_channels())
}

/// POST /api/channels - create a channel.
pub async fn create_channel(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateChannelRequest>,
) -> impl IntoResponse {
    match state.engine.create_channel(&body.name) {
        Ok(()) => (StatusCode::CREATED, body.name).into_response(),
        Err(e @ ChatError::ChannelExists) => {
            (StatusCode::CONFLICT, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response(),
    }
}

/// GET /api/channels/{name}/messages - up to 100 retained messages, oldest
/// first, for history replay.
pub async fn get_channel_history(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    if !state.engine.channel_exists(&name) {
        return (StatusCode::NOT_FOUND, ChatError::ChannelNotFound.to_string()).into_response();
    }

    let messages = state.engine.history(&name);
    Json(HistoryResponse {
        channel: name,
        messages,
    })
    .into_response()
}
