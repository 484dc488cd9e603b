//! Own profile editing and following other users.

use tokio::sync::watch;

use super::StoreOptions;
use crate::gateway::ProfileGateway;
use crate::models::{Profile, ProfilePatch, Session, UserId};
use crate::sync::{InsertionPolicy, SyncedCollection};
use crate::{Error, Result};

const LOAD_FAILED: &str = "Couldn't load profile";
const UPDATE_FAILED: &str = "Couldn't update profile";
const FOLLOW_FAILED: &str = "Couldn't update follow";

/// Profiles the user has opened, including their own.
pub struct ProfileStore<G> {
    gateway: G,
    session: watch::Receiver<Option<Session>>,
    profiles: SyncedCollection<Profile>,
}

impl<G: ProfileGateway> ProfileStore<G> {
    pub fn new(
        gateway: G,
        session: watch::Receiver<Option<Session>>,
        options: &StoreOptions,
    ) -> Self {
        Self {
            gateway,
            session,
            profiles: options.collection("profiles", InsertionPolicy::Append),
        }
    }

    pub const fn collection(&self) -> &SyncedCollection<Profile> {
        &self.profiles
    }

    /// Load the signed-in user's profile.
    pub async fn refresh(&self) -> Result<Profile> {
        let id = self
            .own_id()
            .map_err(|e| self.profiles.reject(LOAD_FAILED, e))?;
        self.open(&id).await
    }

    /// Load any user's profile.
    pub async fn open(&self, id: &UserId) -> Result<Profile> {
        self.profiles
            .load_record(self.gateway.get_profile(id), LOAD_FAILED)
            .await
    }

    /// The signed-in user's profile, if loaded
    pub fn me(&self) -> Option<Profile> {
        let id = self.own_id().ok()?;
        self.profiles.get(&id)
    }

    pub fn get(&self, id: &UserId) -> Option<Profile> {
        self.profiles.get(id)
    }

    /// Apply `patch` to the signed-in user's profile.
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<Profile> {
        let (id, patch) = self
            .own_id()
            .and_then(|id| Ok((id, patch.validated()?)))
            .map_err(|e| self.profiles.reject(UPDATE_FAILED, e))?;

        let pending = self
            .profiles
            .begin_update(&id, |profile| profile.patched(&patch))
            .await
            .map_err(|e| self.profiles.reject(UPDATE_FAILED, e))?;
        let response = self.gateway.update_profile(&id, &patch).await;
        let canonical = pending.settle_with(response, UPDATE_FAILED, |data| {
            data.cloned()
                .map(Some)
                .ok_or_else(|| "server did not return the updated profile".to_string())
        })?;
        tracing::info!("Updated profile {}", id);
        canonical.ok_or_else(|| {
            Error::Unexpected("server did not return the updated profile".to_string())
        })
    }

    /// Follow or unfollow an opened profile, returning the new state.
    pub async fn toggle_follow(&self, id: &UserId) -> Result<bool> {
        if self.own_id().is_ok_and(|own| &own == id) {
            return Err(self.profiles.reject(
                FOLLOW_FAILED,
                Error::Validation("You can't follow yourself".to_string()),
            ));
        }

        let mut followed = false;
        let pending = self
            .profiles
            .begin_update(id, |profile| {
                let next = profile.toggled_follow();
                followed = next.followed_by_me;
                next
            })
            .await
            .map_err(|e| self.profiles.reject(FOLLOW_FAILED, e))?;
        let response = self.gateway.set_follow(id, followed).await;
        pending.settle(response, FOLLOW_FAILED)?;
        Ok(followed)
    }

    fn own_id(&self) -> Result<UserId> {
        self.session
            .borrow()
            .as_ref()
            .map(|session| session.user.id.clone())
            .ok_or_else(|| Error::Validation("Sign in to manage your profile".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::alerts::{AlertKind, RecordingNotifier};
    use crate::gateway::{Fault, MockBackend};
    use crate::stores::test_support::{backend, options, signed_in, signed_out};
    use pretty_assertions::assert_eq;

    async fn loaded() -> (ProfileStore<MockBackend>, MockBackend, Arc<RecordingNotifier>) {
        let (options, notifier) = options();
        let backend = backend();
        let store = ProfileStore::new(backend.clone(), signed_in(), &options);
        store.refresh().await.unwrap();
        (store, backend, notifier)
    }

    fn rename(name: &str) -> ProfilePatch {
        ProfilePatch {
            display_name: Some(name.to_string()),
            ..ProfilePatch::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_loads_own_profile() {
        let (store, _, _) = loaded().await;
        assert_eq!(store.me().unwrap().display_name, "Ada Lovelace");
    }

    #[tokio::test(start_paused = true)]
    async fn update_profile_applies_then_reconciles() {
        let (store, _, notifier) = loaded().await;
        let store = Arc::new(store);

        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.update_profile(rename("Countess Ada")).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(store.me().unwrap().display_name, "Countess Ada");

        let profile = task.await.unwrap().unwrap();
        assert_eq!(store.me().unwrap(), profile);
        assert!(notifier.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_update_restores_profile() {
        let (store, backend, notifier) = loaded().await;
        let before = store.me().unwrap();
        backend.fail_next(Fault::Offline);

        store.update_profile(rename("Someone")).await.unwrap_err();
        assert_eq!(store.me().unwrap(), before);
        assert_eq!(notifier.len(), 1);
        assert_eq!(notifier.alerts()[0].kind, AlertKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_patch_is_a_warning() {
        let (store, backend, notifier) = loaded().await;
        let calls = backend.calls();

        let error = store.update_profile(rename("   ")).await.unwrap_err();
        assert!(matches!(error, Error::Validation(_)));
        assert_eq!(backend.calls(), calls);
        assert_eq!(notifier.alerts()[0].kind, AlertKind::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_follow_adjusts_followers() {
        let (store, backend, notifier) = loaded().await;
        let grace = UserId::from("grace");
        store.open(&grace).await.unwrap();
        assert_eq!(store.get(&grace).unwrap().followers, 900);

        assert!(!store.toggle_follow(&grace).await.unwrap());
        assert_eq!(store.get(&grace).unwrap().followers, 899);

        backend.fail_next(Fault::Offline);
        store.toggle_follow(&grace).await.unwrap_err();
        let grace_profile = store.get(&grace).unwrap();
        assert!(!grace_profile.followed_by_me);
        assert_eq!(grace_profile.followers, 899);
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cannot_follow_yourself() {
        let (store, _, _) = loaded().await;
        let error = store.toggle_follow(&UserId::from("ada")).await.unwrap_err();
        assert!(matches!(error, Error::Validation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_requires_session() {
        let (options, notifier) = options();
        let store = ProfileStore::new(backend(), signed_out(), &options);
        assert!(matches!(store.refresh().await, Err(Error::Validation(_))));
        assert_eq!(store.me(), None);
        assert_eq!(notifier.len(), 1);
    }
}
