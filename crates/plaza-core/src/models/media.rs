//! Media library models

use serde::{Deserialize, Serialize};

use crate::sync::Record;

super::string_id!(
    /// Identifier of a media title
    MediaId
);

super::string_id!(
    /// Identifier of a watch-history entry
    HistoryEntryId
);

/// Kind of media title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
    Clip,
    Podcast,
}

impl MediaKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::Series => "Series",
            Self::Clip => "Clip",
            Self::Podcast => "Podcast",
        }
    }
}

/// A title in the media catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaId,
    pub title: String,
    pub kind: MediaKind,
    pub duration_secs: u32,
    /// Approximate download size
    pub size_bytes: u64,
    pub in_my_list: bool,
}

impl Record for MediaItem {
    type Id = MediaId;

    fn id(&self) -> &MediaId {
        &self.id
    }
}

/// One entry in the watch history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: HistoryEntryId,
    pub media_id: MediaId,
    pub title: String,
    /// Unix ms
    pub watched_at: i64,
}

impl HistoryEntry {
    #[must_use]
    pub fn for_item(item: &MediaItem) -> Self {
        Self {
            id: HistoryEntryId::generate(),
            media_id: item.id.clone(),
            title: item.title.clone(),
            watched_at: crate::util::unix_millis_now(),
        }
    }
}

impl Record for HistoryEntry {
    type Id = HistoryEntryId;

    fn id(&self) -> &HistoryEntryId {
        &self.id
    }
}
