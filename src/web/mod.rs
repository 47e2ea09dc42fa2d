pub mod app_state;
pub mod rest_api;
pub mod router;
pub mod upload;
pub mod ws_handler;
