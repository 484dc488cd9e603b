//! Media catalog, "My List" and watch history.

use super::StoreOptions;
use crate::gateway::LibraryGateway;
use crate::models::{HistoryEntry, MediaId, MediaItem};
use crate::sync::{InsertionPolicy, SyncedCollection};
use crate::{Error, Result};

const CATALOG_FAILED: &str = "Couldn't load library";
const MY_LIST_FAILED: &str = "Couldn't update My List";
const WATCH_FAILED: &str = "Couldn't record watch";
const CLEAR_FAILED: &str = "Couldn't clear history";

pub struct LibraryStore<G> {
    gateway: G,
    catalog: SyncedCollection<MediaItem>,
    history: SyncedCollection<HistoryEntry>,
}

impl<G: LibraryGateway> LibraryStore<G> {
    pub fn new(gateway: G, options: &StoreOptions) -> Self {
        Self {
            gateway,
            catalog: options.collection("catalog", InsertionPolicy::Prepend),
            history: options.collection("history", InsertionPolicy::Append),
        }
    }

    pub const fn catalog(&self) -> &SyncedCollection<MediaItem> {
        &self.catalog
    }

    pub const fn history_collection(&self) -> &SyncedCollection<HistoryEntry> {
        &self.history
    }

    /// Load the catalog and the watch history concurrently.
    ///
    /// Either fetch failing fails the refresh with a single alert.
    pub async fn refresh(&self) -> Result<usize> {
        let (catalog, history) = tokio::join!(
            self.catalog.load_quietly(self.gateway.list_catalog()),
            self.history.load_quietly(self.gateway.list_history()),
        );
        let outcome = history.and(catalog);
        if let Err(error) = &outcome {
            self.catalog.alert_failure(CATALOG_FAILED, error);
        }
        outcome
    }

    pub async fn add_to_my_list(&self, id: &MediaId) -> Result<()> {
        self.set_in_my_list(id, true).await
    }

    pub async fn remove_from_my_list(&self, id: &MediaId) -> Result<()> {
        self.set_in_my_list(id, false).await
    }

    async fn set_in_my_list(&self, id: &MediaId, in_list: bool) -> Result<()> {
        if self
            .catalog
            .get(id)
            .is_some_and(|item| item.in_my_list == in_list)
        {
            return Ok(());
        }

        let pending = self
            .catalog
            .begin_update(id, |item| MediaItem {
                in_my_list: in_list,
                ..item.clone()
            })
            .await
            .map_err(|e| self.catalog.reject(MY_LIST_FAILED, e))?;
        let response = self.gateway.set_in_my_list(id, in_list).await;
        pending.settle(response, MY_LIST_FAILED)?;
        Ok(())
    }

    /// Append a history entry for a catalog title.
    pub async fn record_watch(&self, id: &MediaId) -> Result<HistoryEntry> {
        let item = self.catalog.get(id).ok_or_else(|| {
            self.history.reject(
                WATCH_FAILED,
                Error::NotFound(format!("catalog record {id}")),
            )
        })?;
        let entry = HistoryEntry::for_item(&item);

        let pending = self
            .history
            .begin_insert(entry.clone())
            .await
            .map_err(|e| self.history.reject(WATCH_FAILED, e))?;
        let response = self.gateway.record_watch(&entry).await;
        pending.settle(response, WATCH_FAILED)?;
        Ok(entry)
    }

    /// Remove every history entry and return how many were removed.
    pub async fn clear_history(&self) -> Result<usize> {
        let count = self.history.len();
        if count == 0 {
            return Ok(0);
        }

        let pending = self
            .history
            .begin_remove_where(|_| true)
            .await
            .map_err(|e| self.history.reject(CLEAR_FAILED, e))?;
        let response = self.gateway.clear_history().await;
        pending.settle(response, CLEAR_FAILED)?;
        Ok(count)
    }

    pub fn my_list(&self) -> Vec<MediaItem> {
        self.catalog
            .view(|items| items.iter().filter(|item| item.in_my_list).cloned().collect())
    }

    /// Watch history, most recent first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history
            .view(|entries| entries.iter().rev().cloned().collect())
    }
}
