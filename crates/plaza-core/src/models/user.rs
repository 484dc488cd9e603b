//! User identity shared by friends, posts and sessions

use serde::{Deserialize, Serialize};

super::string_id!(
    /// Identifier of a user account
    UserId
);

/// Minimal public view of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub display_name: String,
    pub handle: String,
}

impl UserSummary {
    #[must_use]
    pub fn new(id: impl Into<UserId>, display_name: &str, handle: &str) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.to_string(),
            handle: handle.to_string(),
        }
    }
}

impl From<&str> for UserSummary {
    fn from(id: &str) -> Self {
        Self::new(id, id, id)
    }
}
