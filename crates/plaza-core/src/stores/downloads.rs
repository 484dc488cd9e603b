//! Offline downloads, persisted locally.

use std::sync::{Arc, Mutex, PoisonError};

use super::{StoreOptions, DOWNLOADS_KEY};
use crate::gateway::DownloadsGateway;
use crate::models::{Download, DownloadStatus, MediaId, MediaItem};
use crate::storage::{load_json, save_json, KeyValueStore};
use crate::sync::{InsertionPolicy, SyncedCollection};
use crate::{Error, Result};

const DOWNLOAD_FAILED: &str = "Couldn't start download";
const REMOVE_FAILED: &str = "Couldn't remove download";

pub struct DownloadsStore<G> {
    gateway: G,
    storage: Arc<dyn KeyValueStore>,
    downloads: SyncedCollection<Download>,
    /// Downloads the server has acknowledged; the only list ever persisted.
    confirmed: Mutex<Vec<Download>>,
}

impl<G: DownloadsGateway> DownloadsStore<G> {
    pub fn new(gateway: G, storage: Arc<dyn KeyValueStore>, options: &StoreOptions) -> Self {
        Self {
            gateway,
            storage,
            downloads: options.collection("downloads", InsertionPolicy::Prepend),
            confirmed: Mutex::new(Vec::new()),
        }
    }

    pub const fn collection(&self) -> &SyncedCollection<Download> {
        &self.downloads
    }

    /// Load downloads saved by a previous run.
    pub fn restore(&self) -> Result<usize> {
        let downloads: Vec<Download> =
            load_json(self.storage.as_ref(), DOWNLOADS_KEY)?.unwrap_or_default();
        let count = downloads.len();
        self.downloads.replace_all(downloads.clone());
        *self.lock_confirmed() = downloads;
        tracing::debug!(count, "Restored downloads");
        Ok(count)
    }

    /// Request a download for a title that may not be in the loaded catalog.
    pub async fn start_download(&self, id: &MediaId) -> Result<Download> {
        self.request(Download::pending_unknown(id.clone())).await
    }

    /// Request a download for a catalog title; the placeholder carries its
    /// title and size.
    pub async fn start_download_for(&self, item: &MediaItem) -> Result<Download> {
        self.request(Download::pending(item)).await
    }

    async fn request(&self, placeholder: Download) -> Result<Download> {
        let id = placeholder.id.clone();
        if self.downloads.contains(&id) {
            return Err(self.downloads.reject(
                DOWNLOAD_FAILED,
                Error::Validation(format!("{} is already downloaded", placeholder.title)),
            ));
        }

        let pending = self
            .downloads
            .begin_insert(placeholder)
            .await
            .map_err(|e| self.downloads.reject(DOWNLOAD_FAILED, e))?;
        let response = self.gateway.request_download(&id).await;
        let canonical = pending.settle_with(response, DOWNLOAD_FAILED, |data| {
            data.cloned()
                .map(Some)
                .ok_or_else(|| "server did not return the download".to_string())
        })?;
        let download = canonical
            .ok_or_else(|| Error::Unexpected("server did not return the download".to_string()))?;
        self.confirm(|confirmed| {
            confirmed.retain(|existing| existing.id != download.id);
            confirmed.insert(0, download.clone());
        });
        Ok(download)
    }

    pub async fn remove_download(&self, id: &MediaId) -> Result<()> {
        let pending = self
            .downloads
            .begin_remove(id)
            .await
            .map_err(|e| self.downloads.reject(REMOVE_FAILED, e))?;
        let response = self.gateway.cancel_download(id).await;
        pending.settle(response, REMOVE_FAILED)?;
        self.confirm(|confirmed| confirmed.retain(|existing| &existing.id != id));
        Ok(())
    }

    pub fn total_bytes(&self) -> u64 {
        self.downloads
            .view(|downloads| downloads.iter().map(|download| download.size_bytes).sum())
    }

    pub fn completed(&self) -> Vec<Download> {
        self.downloads.view(|downloads| {
            downloads
                .iter()
                .filter(|download| download.status == DownloadStatus::Completed)
                .cloned()
                .collect()
        })
    }

    fn lock_confirmed(&self) -> std::sync::MutexGuard<'_, Vec<Download>> {
        self.confirmed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply an acknowledged change to the confirmed list and save it.
    /// Placeholders of downloads still in flight never reach storage, and a
    /// failed save keeps the in-memory state.
    fn confirm(&self, apply: impl FnOnce(&mut Vec<Download>)) {
        let mut confirmed = self.lock_confirmed();
        apply(&mut confirmed);
        if let Err(error) = save_json(self.storage.as_ref(), DOWNLOADS_KEY, &*confirmed) {
            tracing::error!("Failed to persist downloads: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::RecordingNotifier;
    use crate::gateway::{fixtures, Fault, GatewayError, GatewayResult, MockBackend};
    use crate::stores::test_support::LATENCY;
    use crate::storage::MemoryStore;
    use crate::stores::test_support::{backend, options};
    use pretty_assertions::assert_eq;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Storage("disk full".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    fn store(
        storage: Arc<dyn KeyValueStore>,
    ) -> (DownloadsStore<MockBackend>, MockBackend, Arc<RecordingNotifier>) {
        let (options, notifier) = options();
        let backend = backend();
        (DownloadsStore::new(backend.clone(), storage, &options), backend, notifier)
    }

    fn catalog_item(id: &str) -> MediaItem {
        fixtures::catalog()
            .into_iter()
            .find(|item| item.id.as_str() == id)
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn download_is_pending_then_completed_and_persisted() {
        let storage = Arc::new(MemoryStore::default());
        let (store, _, _) = store(storage.clone());
        let store = Arc::new(store);
        let item = catalog_item("m2");

        let task = tokio::spawn({
            let store = Arc::clone(&store);
            let item = item.clone();
            async move { store.start_download_for(&item).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(store.collection().items()[0].status, DownloadStatus::Pending);
        assert!(store.completed().is_empty());

        let download = task.await.unwrap().unwrap();
        assert_eq!(download.status, DownloadStatus::Completed);
        assert_eq!(store.completed(), vec![download]);
        assert_eq!(store.total_bytes(), item.size_bytes);

        let (restored, _, _) = self::store(storage);
        assert_eq!(restored.restore().unwrap(), 1);
        assert_eq!(restored.collection().items(), store.collection().items());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_download_is_removed_and_not_persisted() {
        let storage = Arc::new(MemoryStore::default());
        let (store, backend, notifier) = store(storage.clone());
        backend.fail_next(Fault::Offline);

        store
            .start_download(&MediaId::from("m1"))
            .await
            .unwrap_err();
        assert!(store.collection().is_empty());
        assert_eq!(storage.get(DOWNLOADS_KEY).unwrap(), None);
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_title_placeholder_is_reconciled() {
        let (store, _, _) = store(Arc::new(MemoryStore::default()));
        let download = store.start_download(&MediaId::from("m3")).await.unwrap();
        assert_eq!(download.title, "Apollo Guidance");
        assert!(download.size_bytes > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_download_is_rejected() {
        let (store, backend, notifier) = store(Arc::new(MemoryStore::default()));
        store.start_download(&MediaId::from("m1")).await.unwrap();
        let calls = backend.calls();

        let error = store
            .start_download(&MediaId::from("m1"))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Validation(_)));
        assert_eq!(backend.calls(), calls);
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn persistence_failure_keeps_confirmed_state() {
        let (store, _, notifier) = store(Arc::new(BrokenStore));
        store.start_download(&MediaId::from("m4")).await.unwrap();
        assert_eq!(store.collection().len(), 1);
        assert!(notifier.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn remove_download_updates_storage() {
        let storage = Arc::new(MemoryStore::default());
        let (store, _, _) = store(storage.clone());
        store.start_download(&MediaId::from("m1")).await.unwrap();
        store.start_download(&MediaId::from("m2")).await.unwrap();

        store.remove_download(&MediaId::from("m1")).await.unwrap();
        let saved: Vec<Download> = load_json(storage.as_ref(), DOWNLOADS_KEY).unwrap().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, MediaId::from("m2"));
    }

    /// Answers `m2` late and with a failure; everything else goes to the mock.
    #[derive(Clone)]
    struct SlowRejectingBackend(MockBackend);

    impl DownloadsGateway for SlowRejectingBackend {
        async fn request_download(&self, id: &MediaId) -> GatewayResult<Download> {
            if id.as_str() == "m2" {
                tokio::time::sleep(LATENCY * 5).await;
                return Err(GatewayError::Offline);
            }
            self.0.request_download(id).await
        }

        async fn cancel_download(&self, id: &MediaId) -> GatewayResult<()> {
            self.0.cancel_download(id).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_download_in_flight_is_never_persisted() {
        let storage = Arc::new(MemoryStore::default());
        let (options, notifier) = options();
        let store = DownloadsStore::new(
            SlowRejectingBackend(backend()),
            storage.clone() as Arc<dyn KeyValueStore>,
            &options,
        );

        let (m1, m2) = (MediaId::from("m1"), MediaId::from("m2"));
        let (first, second) = tokio::join!(store.start_download(&m1), store.start_download(&m2));
        first.unwrap();
        second.unwrap_err();
        assert_eq!(notifier.len(), 1);

        let ids = |downloads: Vec<Download>| -> Vec<String> {
            downloads.into_iter().map(|download| download.id.to_string()).collect()
        };
        assert_eq!(ids(store.collection().items()), vec!["m1"]);
        let saved: Vec<Download> = load_json(storage.as_ref(), DOWNLOADS_KEY).unwrap().unwrap();
        assert_eq!(ids(saved), vec!["m1"]);

        let (restored, _, _) = self::store(storage);
        restored.restore().unwrap();
        assert_eq!(ids(restored.collection().items()), vec!["m1"]);
    }
}
