//! Remote gateway contracts.
//!
//! Every gateway call is asynchronous, has no side effect on client state and
//! answers with an [`Envelope`]. A `success: false` envelope and a
//! [`GatewayError`] mean the same thing to callers.

mod mock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    Download, Friend, HistoryEntry, MediaId, MediaItem, Notification, NotificationId, Post,
    PostId, Profile, ProfilePatch, Session, UserId,
};
use crate::util::compact_text;

pub use mock::{fixtures, Fault, MockBackend, DEFAULT_LATENCY};

const DEFAULT_FAILURE_MESSAGE: &str = "Request failed";

/// Response wrapper returned by every gateway call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub const fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Split into the payload or the failure message.
    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self
                .message
                .map(|message| compact_text(&message))
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()))
        }
    }
}

/// Transport-level gateway failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{0}")]
    Rejected(String),
    #[error("Network unavailable")]
    Offline,
    #[error("Request timed out")]
    Timeout,
}

pub type GatewayResult<T> = Result<Envelope<T>, GatewayError>;

/// Collapse both failure shapes into a message.
pub fn flatten_response<T>(response: GatewayResult<T>) -> Result<Option<T>, String> {
    response
        .map_err(|error| error.to_string())
        .and_then(Envelope::into_result)
}

#[allow(async_fn_in_trait)]
pub trait AuthGateway {
    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<Session>;
    async fn sign_out(&self, token: &str) -> GatewayResult<()>;
}

#[allow(async_fn_in_trait)]
pub trait FriendsGateway {
    async fn list_friends(&self) -> GatewayResult<Vec<Friend>>;
    async fn add_friend(&self, id: &UserId) -> GatewayResult<Friend>;
    async fn remove_friend(&self, id: &UserId) -> GatewayResult<()>;
    async fn set_favorite(&self, id: &UserId, favorite: bool) -> GatewayResult<()>;
}

#[allow(async_fn_in_trait)]
pub trait PostsGateway {
    async fn list_feed(&self) -> GatewayResult<Vec<Post>>;
    async fn create_post(&self, post: &Post) -> GatewayResult<Post>;
    async fn set_like(&self, id: &PostId, liked: bool) -> GatewayResult<()>;
    async fn add_comment(&self, id: &PostId, text: &str) -> GatewayResult<()>;
    async fn delete_post(&self, id: &PostId) -> GatewayResult<()>;
}

#[allow(async_fn_in_trait)]
pub trait NotificationsGateway {
    async fn list_notifications(&self) -> GatewayResult<Vec<Notification>>;
    async fn mark_read(&self, ids: &[NotificationId]) -> GatewayResult<()>;
    async fn dismiss(&self, id: &NotificationId) -> GatewayResult<()>;
}

#[allow(async_fn_in_trait)]
pub trait ProfileGateway {
    async fn get_profile(&self, id: &UserId) -> GatewayResult<Profile>;
    async fn update_profile(&self, id: &UserId, patch: &ProfilePatch) -> GatewayResult<Profile>;
    async fn set_follow(&self, id: &UserId, follow: bool) -> GatewayResult<()>;
}

#[allow(async_fn_in_trait)]
pub trait LibraryGateway {
    async fn list_catalog(&self) -> GatewayResult<Vec<MediaItem>>;
    async fn list_history(&self) -> GatewayResult<Vec<HistoryEntry>>;
    async fn set_in_my_list(&self, id: &MediaId, in_list: bool) -> GatewayResult<()>;
    async fn record_watch(&self, entry: &HistoryEntry) -> GatewayResult<()>;
    async fn clear_history(&self) -> GatewayResult<()>;
}

#[allow(async_fn_in_trait)]
pub trait DownloadsGateway {
    async fn request_download(&self, id: &MediaId) -> GatewayResult<Download>;
    async fn cancel_download(&self, id: &MediaId) -> GatewayResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_envelope_uses_default_message_when_blank() {
        let envelope = Envelope::<()> {
            success: false,
            data: None,
            message: Some("  ".to_string()),
        };
        assert_eq!(envelope.into_result().unwrap_err(), DEFAULT_FAILURE_MESSAGE);
    }

    #[test]
    fn flatten_response_maps_transport_errors() {
        let response: GatewayResult<u8> = Err(GatewayError::Timeout);
        assert_eq!(flatten_response(response).unwrap_err(), "Request timed out");
        assert_eq!(flatten_response(Ok(Envelope::ok(3_u8))).unwrap(), Some(3));
    }

    #[test]
    fn envelope_parses_without_optional_fields() {
        let envelope: Envelope<u8> = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(envelope, Envelope::ok_empty());
    }
}
