//! Offline download model

use serde::{Deserialize, Serialize};

use super::{MediaId, MediaItem};
use crate::sync::Record;

/// Download progress state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Requested locally, not yet accepted by the server
    #[default]
    Pending,
    Downloading,
    Completed,
    Failed,
}

impl DownloadStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// A download record, keyed by the media title it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    pub id: MediaId,
    pub title: String,
    pub size_bytes: u64,
    pub status: DownloadStatus,
    /// Unix ms
    pub requested_at: i64,
}

impl Download {
    /// Placeholder inserted before the server accepts the request
    #[must_use]
    pub fn pending(item: &MediaItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            size_bytes: item.size_bytes,
            status: DownloadStatus::Pending,
            requested_at: crate::util::unix_millis_now(),
        }
    }

    /// Placeholder for a title that is not in the loaded catalog
    #[must_use]
    pub fn pending_unknown(id: MediaId) -> Self {
        Self {
            title: id.to_string(),
            id,
            size_bytes: 0,
            status: DownloadStatus::Pending,
            requested_at: crate::util::unix_millis_now(),
        }
    }
}

impl Record for Download {
    type Id = MediaId;

    fn id(&self) -> &MediaId {
        &self.id
    }
}
