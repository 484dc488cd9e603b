//! Pending speculative changes and their commit/rollback paths.

use std::fmt;

use tokio::sync::OwnedMutexGuard;

use super::{Record, SyncedCollection};
use crate::alerts::AlertKind;
use crate::gateway::{flatten_response, GatewayResult};
use crate::{Error, Result};

/// Lifecycle of a single optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Idle,
    AppliedLocal,
    Confirmed,
    RolledBack,
}

impl fmt::Display for MutationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::AppliedLocal => "applied-local",
            Self::Confirmed => "confirmed",
            Self::RolledBack => "rolled-back",
        };
        f.write_str(label)
    }
}

/// Snapshot needed to undo one speculative change.
pub(super) enum Change<T: Record> {
    /// Record-level: prior values of every touched record
    Update { primary: T::Id, priors: Vec<T> },
    /// List-level addition
    Insert { id: T::Id },
    /// List-level removal; prior positions in ascending order
    Remove {
        primary: T::Id,
        removed: Vec<(usize, T)>,
    },
}

impl<T: Record> Change<T> {
    fn primary_id(&self) -> &T::Id {
        match self {
            Self::Update { primary, .. } | Self::Remove { primary, .. } => primary,
            Self::Insert { id } => id,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Update { .. } => "update",
            Self::Insert { .. } => "insert",
            Self::Remove { .. } => "remove",
        }
    }
}

/// A speculative change that has been applied locally and awaits the
/// gateway's verdict.
///
/// Dropping it without calling [`Self::settle`], [`Self::commit`] or
/// [`Self::rollback`] (for example when the awaiting task is cancelled)
/// reverts the change.
#[must_use = "a pending mutation reverts itself when dropped"]
pub struct PendingMutation<T: Record> {
    collection: SyncedCollection<T>,
    change: Option<Change<T>>,
    phase: MutationPhase,
    _permits: Vec<OwnedMutexGuard<()>>,
}

impl<T: Record> PendingMutation<T> {
    pub(super) fn applied(
        collection: SyncedCollection<T>,
        change: Change<T>,
        permits: Vec<OwnedMutexGuard<()>>,
    ) -> Self {
        tracing::debug!(
            collection = collection.name(),
            id = %change.primary_id(),
            kind = change.kind(),
            phase = %MutationPhase::AppliedLocal,
            "Optimistic change applied"
        );
        Self {
            collection,
            change: Some(change),
            phase: MutationPhase::AppliedLocal,
            _permits: permits,
        }
    }

    pub const fn phase(&self) -> MutationPhase {
        self.phase
    }

    /// Resolve against a gateway response, keeping the speculative state on
    /// success.
    pub fn settle<R>(self, response: GatewayResult<R>, failure_title: &str) -> Result<Option<R>> {
        self.settle_with(response, failure_title, |_| Ok(None))
    }

    /// Resolve against a gateway response.
    ///
    /// On success `reconcile` may return the canonical record, which replaces
    /// the speculative one in the same state write as the commit. If it
    /// returns an error the response is treated as a failure. On failure the
    /// snapshot is restored, the collection error is set and exactly one
    /// alert is raised.
    pub fn settle_with<R>(
        self,
        response: GatewayResult<R>,
        failure_title: &str,
        reconcile: impl FnOnce(Option<&R>) -> std::result::Result<Option<T>, String>,
    ) -> Result<Option<R>> {
        let error = match flatten_response(response) {
            Ok(data) => match reconcile(data.as_ref()) {
                Ok(canonical) => {
                    self.commit(canonical);
                    return Ok(data);
                }
                Err(message) => Error::Unexpected(message),
            },
            Err(message) => Error::Remote(message),
        };

        let message = error.to_string();
        let notifier = self.collection.inner.notifier.clone();
        self.rollback_with_error(Some(message.clone()));
        notifier.notify(AlertKind::Error, failure_title, &message);
        Err(error)
    }

    /// Accept the speculative state, optionally replacing the primary record
    /// with its canonical server value.
    pub fn commit(mut self, canonical: Option<T>) {
        let Some(change) = self.change.take() else {
            return;
        };
        let primary = change.primary_id().clone();
        let reconciled = canonical.is_some();
        self.collection.inner.write(|state| {
            if let (Some(canonical), false) = (canonical, matches!(change, Change::Remove { .. })) {
                replace_record(&mut state.items, &primary, canonical);
            }
            state.error = None;
        });
        self.phase = MutationPhase::Confirmed;
        tracing::debug!(
            collection = self.collection.name(),
            id = %primary,
            reconciled,
            phase = %self.phase,
            "Optimistic change confirmed"
        );
    }

    /// Restore the pre-change snapshot without raising an alert.
    pub fn rollback(self) {
        self.rollback_with_error(None);
    }

    fn rollback_with_error(mut self, error: Option<String>) {
        let Some(change) = self.change.take() else {
            return;
        };
        let primary = change.primary_id().clone();
        self.collection.inner.write(|state| {
            restore(&mut state.items, change);
            if error.is_some() {
                state.error = error;
            }
        });
        self.phase = MutationPhase::RolledBack;
        tracing::warn!(
            collection = self.collection.name(),
            id = %primary,
            phase = %self.phase,
            "Optimistic change rolled back"
        );
    }
}

impl<T: Record> Drop for PendingMutation<T> {
    fn drop(&mut self) {
        let Some(change) = self.change.take() else {
            return;
        };
        tracing::warn!(
            collection = self.collection.name(),
            id = %change.primary_id(),
            "Pending mutation dropped before settling, reverting"
        );
        self.collection
            .inner
            .write(|state| restore(&mut state.items, change));
        self.phase = MutationPhase::RolledBack;
    }
}

fn restore<T: Record>(items: &mut Vec<T>, change: Change<T>) {
    match change {
        Change::Update { priors, .. } => {
            for prior in priors {
                if let Some(slot) = items.iter_mut().find(|item| item.id() == prior.id()) {
                    *slot = prior;
                }
            }
        }
        Change::Insert { id } => items.retain(|item| item.id() != &id),
        Change::Remove { removed, .. } => {
            for (index, prior) in removed {
                if !items.iter().any(|item| item.id() == prior.id()) {
                    let index = index.min(items.len());
                    items.insert(index, prior);
                }
            }
        }
    }
}

/// Swap the record at `primary`'s position for `canonical`.
///
/// When the server assigned a different id that is already present, the
/// speculative record is dropped instead so ids stay unique.
fn replace_record<T: Record>(items: &mut Vec<T>, primary: &T::Id, canonical: T) {
    let Some(index) = items.iter().position(|item| item.id() == primary) else {
        return;
    };
    let duplicate = canonical.id() != primary
        && items.iter().any(|item| item.id() == canonical.id());
    if duplicate {
        items.remove(index);
    } else {
        items[index] = canonical;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::alerts::RecordingNotifier;
    use crate::gateway::{Envelope, GatewayError};
    use crate::sync::{InsertionPolicy, OverlapPolicy};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Toggle {
        id: &'static str,
        on: bool,
        count: u32,
    }

    impl Record for Toggle {
        type Id = &'static str;

        fn id(&self) -> &&'static str {
            &self.id
        }
    }

    fn flip(toggle: &Toggle) -> Toggle {
        Toggle {
            on: !toggle.on,
            count: if toggle.on {
                toggle.count - 1
            } else {
                toggle.count + 1
            },
            ..toggle.clone()
        }
    }

    fn setup(overlap: OverlapPolicy) -> (SyncedCollection<Toggle>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let collection =
            SyncedCollection::new("toggles", InsertionPolicy::Prepend, overlap, notifier.clone());
        collection.replace_all(vec![
            Toggle {
                id: "a",
                on: false,
                count: 10,
            },
            Toggle {
                id: "b",
                on: true,
                count: 3,
            },
        ]);
        (collection, notifier)
    }

    #[tokio::test]
    async fn settle_success_keeps_speculative_state() {
        let (collection, notifier) = setup(OverlapPolicy::LastResolvedWins);
        let pending = collection.begin_update(&"a", flip).await.unwrap();
        assert_eq!(pending.phase(), MutationPhase::AppliedLocal);

        let data = pending.settle(Ok(Envelope::ok(7_u32)), "t").unwrap();
        assert_eq!(data, Some(7));
        assert!(collection.get(&"a").unwrap().on);
        assert!(notifier.is_empty());
        assert_eq!(collection.error(), None);
    }

    #[tokio::test]
    async fn settle_failure_restores_exact_record() {
        let (collection, notifier) = setup(OverlapPolicy::LastResolvedWins);
        let before = collection.get(&"a").unwrap();

        let pending = collection.begin_update(&"a", flip).await.unwrap();
        let response: GatewayResult<()> = Err(GatewayError::Rejected("nope".to_string()));
        let error = pending.settle(response, "Couldn't toggle").unwrap_err();

        assert!(matches!(error, Error::Remote(_)));
        assert_eq!(collection.get(&"a").unwrap(), before);
        assert_eq!(notifier.len(), 1);
        assert_eq!(notifier.alerts()[0].title, "Couldn't toggle");
        assert!(collection.error().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn reconcile_error_is_treated_as_failure() {
        let (collection, notifier) = setup(OverlapPolicy::LastResolvedWins);
        let pending = collection.begin_update(&"b", flip).await.unwrap();

        let error = pending
            .settle_with(Ok(Envelope::<Toggle>::ok_empty()), "t", |data| {
                data.cloned()
                    .map(Some)
                    .ok_or_else(|| "missing record".to_string())
            })
            .unwrap_err();

        assert!(matches!(error, Error::Unexpected(_)));
        assert!(collection.get(&"b").unwrap().on);
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test]
    async fn reconcile_replaces_with_canonical_record() {
        let (collection, _) = setup(OverlapPolicy::LastResolvedWins);
        let pending = collection
            .begin_insert(Toggle {
                id: "c",
                on: false,
                count: 0,
            })
            .await
            .unwrap();
        let canonical = Toggle {
            id: "c",
            on: false,
            count: 42,
        };

        pending
            .settle_with(Ok(Envelope::ok(canonical.clone())), "t", |data| {
                Ok(data.cloned())
            })
            .unwrap();
        assert_eq!(collection.items()[0], canonical);
    }

    #[tokio::test]
    async fn canonical_with_existing_id_drops_placeholder() {
        let (collection, _) = setup(OverlapPolicy::LastResolvedWins);
        let pending = collection
            .begin_insert(Toggle {
                id: "tmp",
                on: false,
                count: 0,
            })
            .await
            .unwrap();
        pending.commit(Some(Toggle {
            id: "a",
            on: false,
            count: 10,
        }));
        assert_eq!(collection.len(), 2);
        assert!(!collection.contains(&"tmp"));
    }

    #[tokio::test]
    async fn dropping_pending_mutation_reverts() {
        let (collection, notifier) = setup(OverlapPolicy::LastResolvedWins);
        let before = collection.items();
        {
            let _pending = collection.begin_remove(&"a").await.unwrap();
            assert_eq!(collection.len(), 1);
        }
        assert_eq!(collection.items(), before);
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn overlapping_mutations_last_resolved_wins() {
        let (collection, _) = setup(OverlapPolicy::LastResolvedWins);
        let first = collection.begin_update(&"a", flip).await.unwrap();
        let second = collection.begin_update(&"a", flip).await.unwrap();
        assert!(!collection.get(&"a").unwrap().on);

        // Second confirms, first fails afterwards and restores its snapshot.
        second.settle(Ok(Envelope::<()>::ok_empty()), "t").unwrap();
        let response: GatewayResult<()> = Err(GatewayError::Offline);
        first.settle(response, "t").unwrap_err();
        let a = collection.get(&"a").unwrap();
        assert!(!a.on);
        assert_eq!(a.count, 10);
    }

    #[tokio::test]
    async fn serialized_policy_waits_for_first_mutation() {
        let (collection, _) = setup(OverlapPolicy::SerializePerRecord);
        let first = collection.begin_update(&"a", flip).await.unwrap();

        let waiting = {
            let collection = collection.clone();
            tokio::spawn(async move {
                let pending = collection.begin_update(&"a", flip).await.unwrap();
                pending.commit(None);
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());
        assert!(collection.get(&"a").unwrap().on);

        // Other records are not blocked.
        collection.begin_update(&"b", flip).await.unwrap().commit(None);

        first.commit(None);
        waiting.await.unwrap();
        assert!(!collection.get(&"a").unwrap().on);
    }

    #[test]
    fn phase_display_labels() {
        assert_eq!(MutationPhase::Idle.to_string(), "idle");
        assert_eq!(MutationPhase::RolledBack.to_string(), "rolled-back");
    }
}
