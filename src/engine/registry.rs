use dashmap::DashSet;

use super::error::ChatError;
use super::validation;

/// Tracks the display names of currently-active users and enforces
/// uniqueness among them.
#[derive(Debug, Default)]
pub struct UserRegistry {
    active: DashSet<String>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self {
            active: DashSet::new(),
        }
    }

    /// Claim a display name. The existence check and the insert are a single
    /// atomic operation, so two connections racing on the same name cannot
    /// both win.
    pub fn sign_in(&self, name: &str) -> Result<(), ChatError> {
        validation::validate_display_name(name)?;
        if self.active.insert(name.to_string()) {
            Ok(())
        } else {
            Err(ChatError::NameTaken)
        }
    }

    /// Release a display name. No-op when the name is not active.
    pub fn sign_out(&self, name: &str) {
        self.active.remove(name);
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }
}
