use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use parlor_server::config::ServerConfig;
use parlor_server::engine::chat_engine::ChatEngine;
use parlor_server::web::app_state::AppState;
use parlor_server::web::router::build_router;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (TOML file + env overrides)
    let config = ServerConfig::load("parlor.toml");

    // Create the shared chat engine
    let engine = Arc::new(ChatEngine::new());

    // Ensure upload directory exists
    let upload_dir = PathBuf::from(&config.storage.upload_dir);
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .expect("failed to create upload directory");

    let app_state = Arc::new(AppState {
        engine,
        upload_dir,
        max_file_size: config.storage.max_file_size_mb * 1024 * 1024,
    });

    let app = build_router(app_state);

    info!(address = %config.server.web_address, "Parlor server starting");

    let listener = tokio::net::TcpListener::bind(&config.server.web_address)
        .await
        .expect("failed to bind web listener");

    // Serve with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for Ctrl+C");
            info!("Shutdown signal received, stopping gracefully...");
        })
        .await
        .expect("server error");

    info!("Parlor server stopped");
}
