pub mod channel;
pub mod chat_engine;
pub mod error;
pub mod events;
pub mod registry;
pub mod store;
pub mod user_session;
pub mod validation;
