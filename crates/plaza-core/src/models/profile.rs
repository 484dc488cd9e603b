//! Profile model

use serde::{Deserialize, Serialize};

use super::UserId;
use crate::sync::Record;
use crate::util::normalize_text_option;
use crate::{Error, Result};

pub const MAX_DISPLAY_NAME_CHARS: usize = 50;
pub const MAX_BIO_CHARS: usize = 160;

/// A user's public profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub display_name: String,
    pub handle: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub followers: u32,
    pub following: u32,
    /// Whether the signed-in user follows this profile
    pub followed_by_me: bool,
}

impl Profile {
    /// Apply a validated patch, leaving unspecified fields untouched.
    #[must_use]
    pub fn patched(&self, patch: &ProfilePatch) -> Self {
        let mut next = self.clone();
        if let Some(display_name) = &patch.display_name {
            next.display_name.clone_from(display_name);
        }
        if let Some(bio) = &patch.bio {
            next.bio.clone_from(bio);
        }
        if let Some(avatar_url) = &patch.avatar_url {
            next.avatar_url = normalize_text_option(Some(avatar_url.clone()));
        }
        next
    }

    #[must_use]
    pub fn toggled_follow(&self) -> Self {
        let mut next = self.clone();
        next.followed_by_me = !self.followed_by_me;
        next.followers = if next.followed_by_me {
            self.followers.saturating_add(1)
        } else {
            self.followers.saturating_sub(1)
        };
        next
    }
}

impl Record for Profile {
    type Id = UserId;

    fn id(&self) -> &UserId {
        &self.id
    }
}

/// Partial profile update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    /// Empty string clears the avatar
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl ProfilePatch {
    /// Trim fields and enforce length limits.
    pub fn validated(self) -> Result<Self> {
        let display_name = match self.display_name {
            Some(name) => {
                let name = normalize_text_option(Some(name)).ok_or_else(|| {
                    Error::Validation("Display name cannot be empty".to_string())
                })?;
                if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
                    return Err(Error::Validation(format!(
                        "Display name must be at most {MAX_DISPLAY_NAME_CHARS} characters"
                    )));
                }
                Some(name)
            }
            None => None,
        };

        let bio = self.bio.map(|bio| bio.trim().to_string());
        if let Some(bio) = &bio {
            if bio.chars().count() > MAX_BIO_CHARS {
                return Err(Error::Validation(format!(
                    "Bio must be at most {MAX_BIO_CHARS} characters"
                )));
            }
        }

        if display_name.is_none() && bio.is_none() && self.avatar_url.is_none() {
            return Err(Error::Validation("Nothing to update".to_string()));
        }

        Ok(Self {
            display_name,
            bio,
            avatar_url: self.avatar_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            id: UserId::from("ada"),
            display_name: "Ada".to_string(),
            handle: "ada".to_string(),
            bio: "engines".to_string(),
            avatar_url: Some("https://cdn.example.com/ada.png".to_string()),
            followers: 3,
            following: 2,
            followed_by_me: false,
        }
    }

    #[test]
    fn test_patch_validation_rejects_blank_name() {
        let patch = ProfilePatch {
            display_name: Some("   ".to_string()),
            ..ProfilePatch::default()
        };
        assert!(matches!(patch.validated(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_patch_validation_rejects_long_bio() {
        let patch = ProfilePatch {
            bio: Some("b".repeat(MAX_BIO_CHARS + 1)),
            ..ProfilePatch::default()
        };
        assert!(patch.validated().is_err());
    }

    #[test]
    fn test_empty_patch_is_rejected() {
        assert!(ProfilePatch::default().validated().is_err());
    }

    #[test]
    fn test_patched_updates_only_given_fields() {
        let patch = ProfilePatch {
            bio: Some("  analytical engines ".to_string()),
            avatar_url: Some(String::new()),
            ..ProfilePatch::default()
        }
        .validated()
        .unwrap();

        let next = profile().patched(&patch);
        assert_eq!(next.display_name, "Ada");
        assert_eq!(next.bio, "analytical engines");
        assert_eq!(next.avatar_url, None);
    }

    #[test]
    fn test_toggled_follow_adjusts_followers() {
        let followed = profile().toggled_follow();
        assert!(followed.followed_by_me);
        assert_eq!(followed.followers, 4);
        assert_eq!(followed.toggled_follow(), profile());
    }
}
