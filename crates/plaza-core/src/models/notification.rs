//! Notification model

use serde::{Deserialize, Serialize};

use crate::sync::Record;

super::string_id!(
    /// Identifier of an in-app notification
    NotificationId
);

/// Category of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    FriendRequest,
    Mention,
    Download,
    System,
}

impl NotificationKind {
    /// Icon name rendered next to the notification
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Like => "heart",
            Self::Comment => "chatbubble",
            Self::FriendRequest => "person-add",
            Self::Mention => "at",
            Self::Download => "download",
            Self::System => "information-circle",
        }
    }
}

/// An in-app notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub unread: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Notification {
    #[must_use]
    pub fn new(
        id: impl Into<NotificationId>,
        kind: NotificationKind,
        title: &str,
        body: &str,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.to_string(),
            body: body.to_string(),
            unread: true,
            created_at: crate::util::unix_millis_now(),
        }
    }

    #[must_use]
    pub fn read(&self) -> Self {
        Self {
            unread: false,
            ..self.clone()
        }
    }
}

impl Record for Notification {
    type Id = NotificationId;

    fn id(&self) -> &NotificationId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_notification_is_unread() {
        let notification = Notification::new("n1", NotificationKind::Like, "Ada", "liked");
        assert!(notification.unread);
        assert!(!notification.read().unread);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&NotificationKind::FriendRequest).unwrap();
        assert_eq!(json, "\"friend_request\"");
        assert_eq!(NotificationKind::FriendRequest.icon(), "person-add");
    }
}
