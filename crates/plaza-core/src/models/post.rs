//! Post model

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::UserSummary;
use crate::sync::Record;

super::string_id!(
    /// Identifier of a post; client-created posts use UUID v7 (time-sortable)
    PostId
);

/// Longest post body accepted before calling the gateway
pub const MAX_POST_CHARS: usize = 500;

/// A post in the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: UserSummary,
    pub content: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    pub liked: bool,
    pub likes: u32,
    pub comments: u32,
}

impl Post {
    /// Create a new post authored by `author`
    #[must_use]
    pub fn new(author: UserSummary, content: impl Into<String>) -> Self {
        Self {
            id: PostId::generate(),
            author,
            content: content.into(),
            created_at: crate::util::unix_millis_now(),
            liked: false,
            likes: 0,
            comments: 0,
        }
    }

    /// Flip the like flag and adjust the counter to match.
    #[must_use]
    pub fn toggled_like(&self) -> Self {
        let mut next = self.clone();
        next.liked = !self.liked;
        next.likes = if next.liked {
            self.likes.saturating_add(1)
        } else {
            self.likes.saturating_sub(1)
        };
        next
    }

    /// Extract #tags from content
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        extract_tags(&self.content)
    }

    /// Get first line as preview, truncated to `max_len` characters
    #[must_use]
    pub fn preview(&self, max_len: usize) -> String {
        self.content
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }
}

impl Record for Post {
    type Id = PostId;

    fn id(&self) -> &PostId {
        &self.id
    }
}

/// Extract #tags from text
///
/// Valid tags match the pattern: `#[a-zA-Z][a-zA-Z0-9_-]*`
/// Tags are returned in lowercase, deduplicated and sorted.
///
/// # Examples
///
/// ```
/// use plaza_core::models::extract_tags;
///
/// let tags = extract_tags("Sunset at the pier #Beach #summer-vibes");
/// assert_eq!(tags, vec!["beach", "summer-vibes"]);
/// ```
#[must_use]
pub fn extract_tags(text: &str) -> Vec<String> {
    static TAG_PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = TAG_PATTERN
        .get_or_init(|| Regex::new(r"#([a-zA-Z][a-zA-Z0-9_-]*)").expect("Invalid regex"));
    let mut tags: Vec<String> = re
        .captures_iter(text)
        .map(|cap| cap[1].to_lowercase())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    tags.sort();
    tags
}
