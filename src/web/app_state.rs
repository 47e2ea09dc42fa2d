use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::chat_engine::ChatEngine;

/// Shared application state available to all HTTP/WebSocket handlers.
pub struct AppState {
    pub engine: Arc<ChatEngine>,
    /// Directory uploaded files are stored in and served from.
    pub upload_dir: PathBuf,
    /// Upload payload cap in bytes.
    pub max_file_size: usize,
}
