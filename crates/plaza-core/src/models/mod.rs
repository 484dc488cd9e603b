//! Data models for Plaza

mod download;
mod friend;
mod media;
mod notification;
mod post;
mod profile;
mod session;
mod user;

pub use download::{Download, DownloadStatus};
pub use friend::Friend;
pub use media::{HistoryEntry, HistoryEntryId, MediaId, MediaItem, MediaKind};
pub use notification::{Notification, NotificationId, NotificationKind};
pub use post::{extract_tags, Post, PostId, MAX_POST_CHARS};
pub use profile::{Profile, ProfilePatch};
pub use session::Session;
pub use user::{UserId, UserSummary};

/// Declares a string-backed identifier newtype.
///
/// Fixture records use short readable ids; records created on the client get
/// a UUID v7 so they sort by creation time.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new unique id using UUID v7
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::now_v7().to_string())
            }

            /// Get the string representation of this id
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(crate::Error::Validation(format!(
                        "{} cannot be empty",
                        stringify!($name)
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

pub(crate) use string_id;
