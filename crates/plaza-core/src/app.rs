//! Composition root: builds every store once and hands them out explicitly.

use std::sync::Arc;

use crate::alerts::Notifier;
use crate::config::ClientConfig;
use crate::gateway::{
    AuthGateway, DownloadsGateway, FriendsGateway, LibraryGateway, MockBackend,
    NotificationsGateway, PostsGateway, ProfileGateway,
};
use crate::storage::{FileStore, KeyValueStore};
use crate::stores::{
    DownloadsStore, FriendsStore, LibraryStore, NotificationsStore, PostsStore, ProfileStore,
    SessionStore, StoreOptions,
};
use crate::Result;

/// Everything a store needs from the server side.
pub trait Backend:
    AuthGateway
    + FriendsGateway
    + PostsGateway
    + NotificationsGateway
    + ProfileGateway
    + LibraryGateway
    + DownloadsGateway
    + Clone
{
}

impl<T> Backend for T where
    T: AuthGateway
        + FriendsGateway
        + PostsGateway
        + NotificationsGateway
        + ProfileGateway
        + LibraryGateway
        + DownloadsGateway
        + Clone
{
}

pub struct AppServices<B: Backend = MockBackend> {
    pub backend: B,
    pub session: SessionStore<B>,
    pub friends: FriendsStore<B>,
    pub posts: PostsStore<B>,
    pub notifications: NotificationsStore<B>,
    pub profile: ProfileStore<B>,
    pub library: LibraryStore<B>,
    pub downloads: DownloadsStore<B>,
}

impl AppServices<MockBackend> {
    /// Build services backed by the mock gateway and a file store in the
    /// configured data directory.
    pub fn from_config(config: &ClientConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let data_dir = config.resolved_data_dir()?;
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::in_dir(&data_dir));
        let options = StoreOptions::new(notifier).with_overlap(config.overlap);
        tracing::debug!(
            data_dir = %data_dir.display(),
            latency_ms = config.latency_ms,
            "Building app services"
        );
        Ok(Self::new(MockBackend::new(config.latency()), storage, &options))
    }
}

impl<B: Backend> AppServices<B> {
    pub fn new(backend: B, storage: Arc<dyn KeyValueStore>, options: &StoreOptions) -> Self {
        let session = SessionStore::new(
            backend.clone(),
            Arc::clone(&storage),
            Arc::clone(&options.notifier),
        );
        let identity = session.subscribe();
        Self {
            friends: FriendsStore::new(backend.clone(), options),
            posts: PostsStore::new(backend.clone(), identity.clone(), options),
            notifications: NotificationsStore::new(backend.clone(), options),
            profile: ProfileStore::new(backend.clone(), identity, options),
            library: LibraryStore::new(backend.clone(), options),
            downloads: DownloadsStore::new(backend.clone(), storage, options),
            session,
            backend,
        }
    }

    /// Load durable state left by a previous run.
    pub fn restore(&self) -> Result<()> {
        self.session.restore()?;
        self.downloads.restore()?;
        Ok(())
    }

    /// Stop every collection from accepting writes.
    pub fn unmount(&self) {
        self.friends.collection().unmount();
        self.posts.collection().unmount();
        self.notifications.collection().unmount();
        self.profile.collection().unmount();
        self.library.catalog().unmount();
        self.library.history_collection().unmount();
        self.downloads.collection().unmount();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::alerts::RecordingNotifier;
    use crate::gateway::Fault;
    use crate::models::PostId;
    use crate::storage::MemoryStore;
    use crate::Error;

    fn services() -> (AppServices, Arc<MemoryStore>, Arc<RecordingNotifier>) {
        let storage = Arc::new(MemoryStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let options = StoreOptions::new(notifier.clone());
        let services = AppServices::new(
            MockBackend::new(Duration::from_millis(50)),
            storage.clone(),
            &options,
        );
        (services, storage, notifier)
    }

    #[tokio::test(start_paused = true)]
    async fn stores_share_the_session() {
        let (services, _, _) = services();
        services.posts.refresh().await.unwrap();
        assert!(services.posts.create_post("hi").await.is_err());

        services
            .session
            .sign_in("grace@example.com", "correct horse")
            .await
            .unwrap();
        let post = services.posts.create_post("hi").await.unwrap();
        assert_eq!(post.author.handle, "grace");
        assert_eq!(services.profile.refresh().await.unwrap().handle, "grace");
    }

    #[tokio::test(start_paused = true)]
    async fn restore_reads_previous_run() {
        let (services, storage, _) = services();
        services
            .session
            .sign_in("ada@example.com", "correct horse")
            .await
            .unwrap();
        services
            .downloads
            .start_download(&"m1".into())
            .await
            .unwrap();

        let next = AppServices::new(
            MockBackend::new(Duration::ZERO),
            storage,
            &StoreOptions::new(Arc::new(RecordingNotifier::default())),
        );
        next.restore().unwrap();
        assert_eq!(next.session.user().unwrap().handle, "ada");
        assert_eq!(next.downloads.collection().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_discards_in_flight_results() {
        let (services, _, notifier) = services();
        services.posts.refresh().await.unwrap();
        let before = services.posts.collection().items();
        services.backend.fail_next(Fault::Offline);

        let p1 = PostId::from("p1");
        let like = services.posts.toggle_like(&p1);
        let unmount = async {
            tokio::task::yield_now().await;
            services.unmount();
        };
        let (result, ()) = tokio::join!(like, unmount);

        assert!(matches!(result, Err(Error::Remote(_))));
        assert_ne!(services.posts.collection().items(), before);
        assert_eq!(notifier.len(), 1);
        assert!(matches!(
            services.posts.toggle_like(&p1).await,
            Err(Error::Unmounted("posts"))
        ));
    }
}
