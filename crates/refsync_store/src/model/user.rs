//! Users referenced as item creators or modifiers.

use serde::{Deserialize, Serialize};

/// A user referenced by `created_by` / `last_modified_by` on items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned user id.
    pub id: u64,
    /// Login name.
    pub username: String,
    /// Display name.
    pub name: String,
}

impl User {
    /// Creates a user record.
    pub fn new(id: u64, username: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            name: name.into(),
        }
    }

    /// Name to show in the UI: the display name, falling back to the login.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.username
        } else {
            &self.name
        }
    }
}
