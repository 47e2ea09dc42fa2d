use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use super::app_state::AppState;
use super::rest_api;
use super::upload::upload_file;
use super::ws_handler::ws_upgrade;

/// Build the axum router with all HTTP and WebSocket routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", axum::routing::get(ws_upgrade))
        .route(
            "/api/channels",
            axum::routing::get(rest_api::get_channels).post(rest_api::create_channel),
        )
        .route(
            "/api/channels/{name}/messages",
            axum::routing::get(rest_api::get_channel_history),
        )
        .route(
            "/api/upload",
            axum::routing::post(upload_file)
                .layer::<_, std::convert::Infallible>(RequestBodyLimitLayer::new(
                    state.max_file_size,
                ))
                .layer(DefaultBodyLimit::max(state.max_file_size)),
        )
        .nest_service("/uploads", ServeDir::new(&state.upload_dir))
        .layer(cors)
        .with_state(state)
}
