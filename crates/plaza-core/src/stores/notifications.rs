//! Notification inbox.

use super::StoreOptions;
use crate::gateway::NotificationsGateway;
use crate::models::{Notification, NotificationId};
use crate::sync::{InsertionPolicy, SyncedCollection};
use crate::Result;

const LOAD_FAILED: &str = "Couldn't load notifications";
const READ_FAILED: &str = "Couldn't mark as read";
const DISMISS_FAILED: &str = "Couldn't dismiss notification";

pub struct NotificationsStore<G> {
    gateway: G,
    notifications: SyncedCollection<Notification>,
}

impl<G: NotificationsGateway> NotificationsStore<G> {
    pub fn new(gateway: G, options: &StoreOptions) -> Self {
        Self {
            gateway,
            notifications: options.collection("notifications", InsertionPolicy::Prepend),
        }
    }

    pub const fn collection(&self) -> &SyncedCollection<Notification> {
        &self.notifications
    }

    pub async fn refresh(&self) -> Result<usize> {
        self.notifications
            .load(self.gateway.list_notifications(), LOAD_FAILED)
            .await
    }

    /// Background refresh. Failures are logged and the current inbox kept.
    pub async fn poll(&self) -> Option<usize> {
        match self
            .notifications
            .load_quietly(self.gateway.list_notifications())
            .await
        {
            Ok(count) => Some(count),
            Err(error) => {
                tracing::warn!("Notification poll failed: {}", error);
                None
            }
        }
    }

    /// Mark one notification read. Already-read notifications are left alone.
    pub async fn mark_read(&self, id: &NotificationId) -> Result<()> {
        let already_read = self
            .notifications
            .get(id)
            .is_some_and(|notification| !notification.unread);
        if already_read {
            return Ok(());
        }

        let pending = self
            .notifications
            .begin_update(id, Notification::read)
            .await
            .map_err(|e| self.notifications.reject(READ_FAILED, e))?;
        let response = self.gateway.mark_read(std::slice::from_ref(id)).await;
        pending.settle(response, READ_FAILED)?;
        Ok(())
    }

    /// Mark every unread notification read and return how many changed.
    pub async fn mark_all_read(&self) -> Result<usize> {
        let ids: Vec<NotificationId> = self
            .unread()
            .into_iter()
            .map(|notification| notification.id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let pending = self
            .notifications
            .begin_update_where(|notification| notification.unread, Notification::read)
            .await
            .map_err(|e| self.notifications.reject(READ_FAILED, e))?;
        let response = self.gateway.mark_read(&ids).await;
        pending.settle(response, READ_FAILED)?;
        Ok(ids.len())
    }

    pub async fn dismiss(&self, id: &NotificationId) -> Result<()> {
        let pending = self
            .notifications
            .begin_remove(id)
            .await
            .map_err(|e| self.notifications.reject(DISMISS_FAILED, e))?;
        let response = self.gateway.dismiss(id).await;
        pending.settle(response, DISMISS_FAILED)?;
        Ok(())
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.view(|notifications| {
            notifications
                .iter()
                .filter(|notification| notification.unread)
                .count()
        })
    }

    pub fn unread(&self) -> Vec<Notification> {
        self.notifications.view(|notifications| {
            notifications
                .iter()
                .filter(|notification| notification.unread)
                .cloned()
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::alerts::RecordingNotifier;
    use crate::gateway::{Fault, MockBackend};
    use crate::stores::test_support::{backend, options};
    use crate::Error;
    use pretty_assertions::assert_eq;

    async fn loaded() -> (
        NotificationsStore<MockBackend>,
        MockBackend,
        Arc<RecordingNotifier>,
    ) {
        let (options, notifier) = options();
        let backend = backend();
        let store = NotificationsStore::new(backend.clone(), &options);
        store.refresh().await.unwrap();
        (store, backend, notifier)
    }

    fn counted_unread(store: &NotificationsStore<MockBackend>) -> usize {
        store
            .collection()
            .items()
            .iter()
            .filter(|notification| notification.unread)
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn unread_count_matches_items_after_every_step() {
        let (store, backend, _) = loaded().await;
        assert_eq!(store.unread_count(), 2);
        assert_eq!(store.unread_count(), counted_unread(&store));

        store.mark_read(&NotificationId::from("n1")).await.unwrap();
        assert_eq!(store.unread_count(), 1);
        assert_eq!(store.unread_count(), counted_unread(&store));

        backend.fail_next(Fault::Offline);
        store
            .mark_read(&NotificationId::from("n2"))
            .await
            .unwrap_err();
        assert_eq!(store.unread_count(), 1);
        assert_eq!(store.unread_count(), counted_unread(&store));
    }

    #[tokio::test(start_paused = true)]
    async fn mark_read_twice_calls_gateway_once() {
        let (store, backend, notifier) = loaded().await;
        let n1 = NotificationId::from("n1");
        let calls = backend.calls();

        store.mark_read(&n1).await.unwrap();
        store.mark_read(&n1).await.unwrap();
        assert_eq!(backend.calls(), calls + 1);
        assert!(notifier.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn mark_all_read_rolls_back_every_record() {
        let (store, backend, notifier) = loaded().await;
        let before = store.collection().items();
        backend.fail_next(Fault::Envelope("inbox locked".to_string()));

        let error = store.mark_all_read().await.unwrap_err();
        assert!(matches!(error, Error::Remote(_)));
        assert_eq!(store.collection().items(), before);
        assert_eq!(notifier.len(), 1);

        assert_eq!(store.mark_all_read().await.unwrap(), 2);
        assert_eq!(store.unread_count(), 0);
        assert_eq!(store.mark_all_read().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn mark_all_read_is_visible_before_resolve() {
        let (store, _, _) = loaded().await;
        let store = Arc::new(store);

        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.mark_all_read().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(store.unread_count(), 0);
        assert_eq!(task.await.unwrap().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_removes_and_survives_refresh() {
        let (store, _, _) = loaded().await;
        store.dismiss(&NotificationId::from("n3")).await.unwrap();
        assert_eq!(store.collection().len(), 3);

        store.refresh().await.unwrap();
        assert!(!store.collection().contains(&NotificationId::from("n3")));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failure_is_quiet() {
        let (store, backend, notifier) = loaded().await;
        backend.fail_next(Fault::Offline);

        assert_eq!(store.poll().await, None);
        assert_eq!(store.collection().len(), 4);
        assert!(notifier.is_empty());
        assert_eq!(store.poll().await, Some(4));
    }
}
