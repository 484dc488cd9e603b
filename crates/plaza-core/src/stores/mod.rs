//! State stores: one per domain, each owning its collections.
//!
//! Every user-triggered mutation validates its input, applies the change
//! locally, awaits the gateway once and then commits or rolls back. Failures
//! reach the user as exactly one alert and the caller as a typed
//! [`crate::Error`].

mod downloads;
mod friends;
mod library;
mod notifications;
mod posts;
mod profile;
mod session;

use std::sync::Arc;

use crate::alerts::Notifier;
use crate::sync::{InsertionPolicy, OverlapPolicy, Record, SyncedCollection};

pub use downloads::DownloadsStore;
pub use friends::FriendsStore;
pub use library::LibraryStore;
pub use notifications::NotificationsStore;
pub use posts::PostsStore;
pub use profile::ProfileStore;
pub use session::SessionStore;

/// Storage key of the persisted session
pub const SESSION_KEY: &str = "session";
/// Storage key of the persisted download list
pub const DOWNLOADS_KEY: &str = "downloads";

/// Settings shared by every store.
#[derive(Clone)]
pub struct StoreOptions {
    pub notifier: Arc<dyn Notifier>,
    pub overlap: OverlapPolicy,
}

impl StoreOptions {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            overlap: OverlapPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    fn collection<T: Record>(
        &self,
        name: &'static str,
        insertion: InsertionPolicy,
    ) -> SyncedCollection<T> {
        SyncedCollection::new(name, insertion, self.overlap, Arc::clone(&self.notifier))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::watch;

    use super::StoreOptions;
    use crate::alerts::RecordingNotifier;
    use crate::gateway::MockBackend;
    use crate::models::{Session, UserSummary};

    pub const LATENCY: Duration = Duration::from_millis(100);

    pub fn options() -> (StoreOptions, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        (StoreOptions::new(notifier.clone()), notifier)
    }

    pub fn backend() -> MockBackend {
        MockBackend::new(LATENCY)
    }

    pub fn signed_in() -> watch::Receiver<Option<Session>> {
        let (_, receiver) = watch::channel(Some(Session {
            user: UserSummary::new("ada", "Ada Lovelace", "ada"),
            token: "token".to_string(),
            expires_at: i64::MAX,
        }));
        receiver
    }

    pub fn signed_out() -> watch::Receiver<Option<Session>> {
        let (_, receiver) = watch::channel(None);
        receiver
    }
}
