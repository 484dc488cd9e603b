//! Reactive in-memory collection with optimistic mutation entry points.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, OwnedMutexGuard};

use super::mutation::{Change, PendingMutation};
use super::Record;
use crate::alerts::{AlertKind, Notifier};
use crate::gateway::{flatten_response, GatewayResult};
use crate::{Error, Result};

/// Observable state of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionState<T> {
    pub items: Vec<T>,
    /// True only while a fetch is outstanding
    pub loading: bool,
    /// Message of the most recent failure, cleared by the next success
    pub error: Option<String>,
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

/// Where newly created records land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionPolicy {
    /// Most recent first (feeds, inboxes)
    #[default]
    Prepend,
    /// Chronological (history lists)
    Append,
}

/// How overlapping mutations on the same record are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// No locking: each mutation snapshots whatever state the previous one
    /// left and whichever response resolves last decides the final value.
    #[default]
    LastResolvedWins,
    /// A second mutation on a record waits until the first one settles.
    SerializePerRecord,
}

pub(super) struct Inner<T: Record> {
    pub(super) name: &'static str,
    state: watch::Sender<CollectionState<T>>,
    insertion: InsertionPolicy,
    overlap: OverlapPolicy,
    alive: AtomicBool,
    locks: Mutex<HashMap<T::Id, Arc<tokio::sync::Mutex<()>>>>,
    pub(super) notifier: Arc<dyn Notifier>,
}

impl<T: Record> Inner<T> {
    fn is_mounted(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Apply an infallible write unless the collection has been unmounted.
    pub(super) fn write(&self, f: impl FnOnce(&mut CollectionState<T>)) -> bool {
        if !self.is_mounted() {
            tracing::debug!(collection = self.name, "Skipping state write after unmount");
            return false;
        }
        self.state.send_modify(f);
        true
    }

    /// Apply a write that may be rejected; subscribers are only notified when
    /// `f` succeeds, and `f` must leave the state untouched when it fails.
    fn try_write<R>(&self, f: impl FnOnce(&mut CollectionState<T>) -> Result<R>) -> Result<R> {
        if !self.is_mounted() {
            return Err(Error::Unmounted(self.name));
        }
        let mut outcome = Err(Error::Unexpected(format!(
            "{} state write did not run",
            self.name
        )));
        self.state.send_if_modified(|state| {
            outcome = f(state);
            outcome.is_ok()
        });
        outcome
    }

    fn not_found(&self, id: &T::Id) -> Error {
        Error::NotFound(format!("{} record {id}", self.name))
    }
}

/// Shared handle to a reactive collection of records.
///
/// Cloning yields another handle to the same collection.
pub struct SyncedCollection<T: Record> {
    pub(super) inner: Arc<Inner<T>>,
}

impl<T: Record> Clone for SyncedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Record> SyncedCollection<T> {
    /// Create an empty, mounted collection.
    pub fn new(
        name: &'static str,
        insertion: InsertionPolicy,
        overlap: OverlapPolicy,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (state, _) = watch::channel(CollectionState::default());
        Self {
            inner: Arc::new(Inner {
                name,
                state,
                insertion,
                overlap,
                alive: AtomicBool::new(true),
                locks: Mutex::new(HashMap::new()),
                notifier,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn insertion_policy(&self) -> InsertionPolicy {
        self.inner.insertion
    }

    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.inner.overlap
    }

    /// Receive a notification on every committed state change.
    pub fn subscribe(&self) -> watch::Receiver<CollectionState<T>> {
        self.inner.state.subscribe()
    }

    /// Copy of the full observable state.
    pub fn state(&self) -> CollectionState<T> {
        self.inner.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<T> {
        self.inner.state.borrow().items.clone()
    }

    pub fn get(&self, id: &T::Id) -> Option<T> {
        self.view(|items| items.iter().find(|item| item.id() == id).cloned())
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.view(|items| items.iter().any(|item| item.id() == id))
    }

    pub fn len(&self) -> usize {
        self.view(<[T]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    /// Compute a derived value from the current items.
    ///
    /// Derived values are never cached; every call sees the latest items.
    pub fn view<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.state.borrow().items)
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.is_mounted()
    }

    /// Stop applying state writes. In-flight mutations still resolve but
    /// leave the state untouched.
    pub fn unmount(&self) {
        self.inner.alive.store(false, Ordering::Release);
        tracing::debug!(collection = self.inner.name, "Collection unmounted");
    }

    /// Replace every item with freshly fetched records.
    ///
    /// Records repeating an earlier id are dropped so ids stay unique.
    pub fn replace_all(&self, records: Vec<T>) {
        let mut seen = std::collections::HashSet::with_capacity(records.len());
        let mut unique = Vec::with_capacity(records.len());
        for record in records {
            if seen.insert(record.id().clone()) {
                unique.push(record);
            } else {
                tracing::warn!(
                    collection = self.inner.name,
                    id = %record.id(),
                    "Dropping duplicate record from fetch"
                );
            }
        }
        self.inner.write(|state| {
            state.items = unique;
            state.error = None;
        });
    }

    /// Mark the collection as loading until the returned guard is dropped.
    pub fn start_loading(&self) -> LoadingGuard<T> {
        self.inner.write(|state| {
            state.loading = true;
            state.error = None;
        });
        LoadingGuard {
            collection: self.clone(),
        }
    }

    /// Run a fetch and replace the items with its result.
    ///
    /// Failures keep the current items, record the error and raise one alert
    /// titled `failure_title`.
    pub async fn load<F>(&self, fetch: F, failure_title: &str) -> Result<usize>
    where
        F: Future<Output = GatewayResult<Vec<T>>>,
    {
        match self.load_quietly(fetch).await {
            Ok(count) => Ok(count),
            Err(error) => {
                self.alert_failure(failure_title, &error);
                Err(error)
            }
        }
    }

    /// Like [`Self::load`] but without alerting; for best-effort background
    /// refreshes.
    pub async fn load_quietly<F>(&self, fetch: F) -> Result<usize>
    where
        F: Future<Output = GatewayResult<Vec<T>>>,
    {
        let _loading = self.start_loading();
        let response = fetch.await;
        match flatten_response(response) {
            Ok(Some(records)) => {
                let count = records.len();
                self.replace_all(records);
                tracing::debug!(collection = self.inner.name, count, "Collection loaded");
                Ok(count)
            }
            Ok(None) => {
                let message = "response did not include any records".to_string();
                self.set_error(Some(message.clone()));
                Err(Error::Unexpected(message))
            }
            Err(message) => {
                tracing::warn!(collection = self.inner.name, "Fetch failed: {}", message);
                self.set_error(Some(message.clone()));
                Err(Error::Remote(message))
            }
        }
    }

    /// Fetch one record and upsert it, alerting on failure like [`Self::load`].
    pub async fn load_record<F>(&self, fetch: F, failure_title: &str) -> Result<T>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        let outcome = {
            let _loading = self.start_loading();
            flatten_response(fetch.await)
        };
        let error = match outcome {
            Ok(Some(record)) => {
                self.upsert(record.clone());
                return Ok(record);
            }
            Ok(None) => Error::Unexpected("response did not include the record".to_string()),
            Err(message) => Error::Remote(message),
        };
        let message = error.to_string();
        self.set_error(Some(message.clone()));
        self.inner
            .notifier
            .notify(AlertKind::Error, failure_title, &message);
        Err(error)
    }

    pub fn set_error(&self, error: Option<String>) {
        self.inner.write(|state| state.error = error);
    }

    /// Reject input before any state change, raising one warning alert.
    ///
    /// Errors caused by an unmounted collection are returned without alerting.
    pub fn reject(&self, title: &str, error: Error) -> Error {
        if matches!(error, Error::Unmounted(_)) {
            return error;
        }
        let message = error.to_string();
        self.set_error(Some(message.clone()));
        self.inner
            .notifier
            .notify(AlertKind::Warning, title, &message);
        error
    }

    /// Raise the single error alert for a failed remote operation.
    pub fn alert_failure(&self, title: &str, error: &Error) {
        self.inner
            .notifier
            .notify(AlertKind::Error, title, &error.to_string());
    }

    /// Speculatively replace one record with `transform(record)`.
    pub async fn begin_update(
        &self,
        id: &T::Id,
        transform: impl FnOnce(&T) -> T,
    ) -> Result<PendingMutation<T>> {
        let permits = self.acquire(std::slice::from_ref(id)).await;
        let change = self.inner.try_write(|state| {
            let index = state
                .items
                .iter()
                .position(|item| item.id() == id)
                .ok_or_else(|| self.inner.not_found(id))?;
            let prior = state.items[index].clone();
            let next = transform(&prior);
            if next.id() != id {
                return Err(Error::Validation(format!(
                    "{} transform changed record id {id} to {}",
                    self.inner.name,
                    next.id()
                )));
            }
            state.items[index] = next;
            Ok(Change::Update {
                primary: id.clone(),
                priors: vec![prior],
            })
        })?;
        Ok(PendingMutation::applied(self.clone(), change, permits))
    }

    /// Speculatively transform every record matching `predicate`.
    pub async fn begin_update_where(
        &self,
        predicate: impl Fn(&T) -> bool,
        mut transform: impl FnMut(&T) -> T,
    ) -> Result<PendingMutation<T>> {
        let ids: Vec<T::Id> = self.view(|items| {
            items
                .iter()
                .filter(|item| predicate(item))
                .map(|item| item.id().clone())
                .collect()
        });
        let Some(primary) = ids.first().cloned() else {
            return Err(Error::NotFound(format!(
                "no matching {} records",
                self.inner.name
            )));
        };
        let permits = self.acquire(&ids).await;

        let change = self.inner.try_write(|state| {
            let mut replacements = Vec::new();
            for (index, item) in state.items.iter().enumerate() {
                if !ids.contains(item.id()) || !predicate(item) {
                    continue;
                }
                let next = transform(item);
                if next.id() != item.id() {
                    return Err(Error::Validation(format!(
                        "{} transform changed record id {}",
                        self.inner.name,
                        item.id()
                    )));
                }
                replacements.push((index, next));
            }
            if replacements.is_empty() {
                return Err(Error::NotFound(format!(
                    "no matching {} records",
                    self.inner.name
                )));
            }
            let priors = replacements
                .into_iter()
                .map(|(index, next)| std::mem::replace(&mut state.items[index], next))
                .collect();
            Ok(Change::Update { primary, priors })
        })?;
        Ok(PendingMutation::applied(self.clone(), change, permits))
    }

    /// Speculatively add a record according to the insertion policy.
    pub async fn begin_insert(&self, record: T) -> Result<PendingMutation<T>> {
        let id = record.id().clone();
        let permits = self.acquire(std::slice::from_ref(&id)).await;
        let insertion = self.inner.insertion;
        let change = self.inner.try_write(|state| {
            if state.items.iter().any(|item| item.id() == &id) {
                return Err(Error::Validation(format!(
                    "{} record {id} already exists",
                    self.inner.name
                )));
            }
            match insertion {
                InsertionPolicy::Prepend => state.items.insert(0, record),
                InsertionPolicy::Append => state.items.push(record),
            }
            Ok(Change::Insert { id: id.clone() })
        })?;
        Ok(PendingMutation::applied(self.clone(), change, permits))
    }

    /// Speculatively remove a record, remembering its position.
    pub async fn begin_remove(&self, id: &T::Id) -> Result<PendingMutation<T>> {
        let permits = self.acquire(std::slice::from_ref(id)).await;
        let change = self.inner.try_write(|state| {
            let index = state
                .items
                .iter()
                .position(|item| item.id() == id)
                .ok_or_else(|| self.inner.not_found(id))?;
            let prior = state.items.remove(index);
            Ok(Change::Remove {
                primary: id.clone(),
                removed: vec![(index, prior)],
            })
        })?;
        Ok(PendingMutation::applied(self.clone(), change, permits))
    }

    /// Speculatively remove every record matching `predicate`.
    pub async fn begin_remove_where(
        &self,
        predicate: impl Fn(&T) -> bool,
    ) -> Result<PendingMutation<T>> {
        let ids: Vec<T::Id> = self.view(|items| {
            items
                .iter()
                .filter(|item| predicate(item))
                .map(|item| item.id().clone())
                .collect()
        });
        let Some(primary) = ids.first().cloned() else {
            return Err(Error::NotFound(format!(
                "no matching {} records",
                self.inner.name
            )));
        };
        let permits = self.acquire(&ids).await;

        let change = self.inner.try_write(|state| {
            let mut removed = Vec::new();
            let mut kept = Vec::with_capacity(state.items.len());
            for (index, item) in std::mem::take(&mut state.items).into_iter().enumerate() {
                if ids.contains(item.id()) && predicate(&item) {
                    removed.push((index, item));
                } else {
                    kept.push(item);
                }
            }
            if removed.is_empty() {
                state.items = kept;
                return Err(Error::NotFound(format!(
                    "no matching {} records",
                    self.inner.name
                )));
            }
            state.items = kept;
            Ok(Change::Remove { primary, removed })
        })?;
        Ok(PendingMutation::applied(self.clone(), change, permits))
    }

    /// Insert or replace a record outside the optimistic flow, for
    /// single-record fetches.
    pub fn upsert(&self, record: T) {
        let insertion = self.inner.insertion;
        self.inner.write(|state| {
            if let Some(slot) = state.items.iter_mut().find(|item| item.id() == record.id()) {
                *slot = record;
            } else {
                match insertion {
                    InsertionPolicy::Prepend => state.items.insert(0, record),
                    InsertionPolicy::Append => state.items.push(record),
                }
            }
            state.error = None;
        });
    }

    /// Lock every id in sorted order so overlapping multi-record mutations
    /// cannot deadlock. Entries nobody holds or waits on are pruned first.
    async fn acquire(&self, ids: &[T::Id]) -> Vec<OwnedMutexGuard<()>> {
        if self.inner.overlap == OverlapPolicy::LastResolvedWins {
            return Vec::new();
        }
        let mut ordered = ids.to_vec();
        ordered.sort();
        ordered.dedup();

        let locks: Vec<_> = {
            let mut table = self
                .inner
                .locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            ordered
                .into_iter()
                .map(|id| Arc::clone(table.entry(id).or_default()))
                .collect()
        };
        let mut permits = Vec::with_capacity(locks.len());
        for lock in locks {
            permits.push(lock.lock_owned().await);
        }
        permits
    }

    #[cfg(test)]
    fn lock_entries(&self) -> usize {
        self.inner
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Clears the loading flag when dropped, whatever the fetch outcome.
pub struct LoadingGuard<T: Record> {
    collection: SyncedCollection<T>,
}

impl<T: Record> Drop for LoadingGuard<T> {
    fn drop(&mut self) {
        self.collection.inner.write(|state| state.loading = false);
    }
}
