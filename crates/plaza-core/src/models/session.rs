//! Signed-in session model

use std::fmt;

use serde::{Deserialize, Serialize};

use super::UserSummary;

const EXPIRY_SKEW_MILLIS: i64 = 60_000;

/// Active authenticated session
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: UserSummary,
    pub token: String,
    /// Unix ms
    pub expires_at: i64,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= crate::util::unix_millis_now() + EXPIRY_SKEW_MILLIS
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_debug_redacts_token() {
        let session = Session {
            user: UserSummary::from("ada"),
            token: "secret".to_string(),
            expires_at: 0,
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
        assert!(session.is_expired());
    }
}
