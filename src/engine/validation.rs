use super::error::ChatError;

/// Minimum length of a display name, in characters.
pub const MIN_NAME_LEN: usize = 2;

pub fn validate_display_name(name: &str) -> Result<(), ChatError> {
    if name.is_empty() || name.chars().count() < MIN_NAME_LEN {
        return Err(ChatError::InvalidName);
    }
    Ok(())
}

/// Channel names only need to be non-empty; they are case-sensitive and
/// otherwise unrestricted.
pub fn validate_channel_name(name: &str) -> Result<(), ChatError> {
    if name.is_empty() {
        return Err(ChatError::InvalidName);
    }
    Ok(())
}
