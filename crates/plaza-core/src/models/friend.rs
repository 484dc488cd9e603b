//! Friend model

use serde::{Deserialize, Serialize};

use super::{UserId, UserSummary};
use crate::sync::Record;

/// A friend in the user's social graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub id: UserId,
    pub display_name: String,
    pub handle: String,
    pub online: bool,
    pub favorite: bool,
    /// When the friendship was confirmed (Unix ms)
    pub since: i64,
}

impl Friend {
    /// Placeholder shown while an add-friend request is in flight.
    #[must_use]
    pub fn pending(id: UserId) -> Self {
        Self {
            display_name: id.to_string(),
            handle: id.to_string(),
            id,
            online: false,
            favorite: false,
            since: crate::util::unix_millis_now(),
        }
    }

    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            handle: self.handle.clone(),
        }
    }
}

impl Record for Friend {
    type Id = UserId;

    fn id(&self) -> &UserId {
        &self.id
    }
}
