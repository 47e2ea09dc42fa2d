use thiserror::Error;

/// Recoverable engine errors. Each is surfaced to the initiating connection
/// as a user-visible message; none is fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("Please enter a valid name.")]
    InvalidName,

    #[error("that username already exists!")]
    NameTaken,

    #[error("that channel already exists!")]
    ChannelExists,

    #[error("no such channel")]
    ChannelNotFound,

    #[error("you must sign in first")]
    NotAuthenticated,

    #[error("you are not in a channel")]
    NotInChannel,
}

impl ChatError {
    /// Stable machine-readable code for the wire `error` event.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::InvalidName => "invalid_name",
            ChatError::NameTaken => "name_taken",
            ChatError::ChannelExists => "channel_exists",
            ChatError::ChannelNotFound => "channel_not_found",
            ChatError::NotAuthenticated => "not_authenticated",
            ChatError::NotInChannel => "not_in_channel",
        }
    }
}
