//! Signed-in session, persisted across launches.

use std::sync::Arc;

use tokio::sync::watch;

use super::SESSION_KEY;
use crate::alerts::{AlertKind, Notifier};
use crate::gateway::{flatten_response, AuthGateway};
use crate::models::{Session, UserSummary};
use crate::storage::{load_json, save_json, KeyValueStore};
use crate::{Error, Result};

const SIGN_IN_FAILED: &str = "Couldn't sign in";

/// Owns the current session. Other stores read it through
/// [`SessionStore::subscribe`] and never write it.
pub struct SessionStore<G> {
    gateway: G,
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    session: watch::Sender<Option<Session>>,
}

impl<G: AuthGateway> SessionStore<G> {
    pub fn new(gateway: G, storage: Arc<dyn KeyValueStore>, notifier: Arc<dyn Notifier>) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            gateway,
            storage,
            notifier,
            session,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    pub fn current(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub fn user(&self) -> Option<UserSummary> {
        self.session
            .borrow()
            .as_ref()
            .map(|session| session.user.clone())
    }

    /// Load a persisted session, discarding it when expired.
    pub fn restore(&self) -> Result<Option<Session>> {
        let Some(stored) = load_json::<Session>(self.storage.as_ref(), SESSION_KEY)? else {
            return Ok(None);
        };
        if stored.is_expired() {
            tracing::info!("Persisted session for {} expired", stored.user.handle);
            self.storage.remove(SESSION_KEY)?;
            return Ok(None);
        }
        tracing::debug!("Restored session for {}", stored.user.handle);
        self.session.send_replace(Some(stored.clone()));
        Ok(Some(stored))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        if let Err(error) = validate_credentials(email, password) {
            self.notifier
                .notify(AlertKind::Warning, SIGN_IN_FAILED, &error.to_string());
            return Err(error);
        }

        let response = self.gateway.sign_in(email.trim(), password).await;
        let session = match flatten_response(response) {
            Ok(Some(session)) => session,
            Ok(None) => {
                let error =
                    Error::Unexpected("sign-in response did not include a session".to_string());
                self.notifier
                    .notify(AlertKind::Error, SIGN_IN_FAILED, &error.to_string());
                return Err(error);
            }
            Err(message) => {
                let error = Error::Remote(message);
                self.notifier
                    .notify(AlertKind::Error, SIGN_IN_FAILED, &error.to_string());
                return Err(error);
            }
        };

        if let Err(error) = save_json(self.storage.as_ref(), SESSION_KEY, &session) {
            tracing::error!("Failed to persist session: {}", error);
        }
        tracing::info!("Signed in as {}", session.user.handle);
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    /// Clear the session locally, then tell the server.
    ///
    /// The local sign-out stands even if the server call fails; that failure
    /// is only logged.
    pub async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.session.send_replace(None) else {
            return Ok(());
        };
        self.storage.remove(SESSION_KEY)?;
        if let Err(message) = flatten_response(self.gateway.sign_out(&session.token).await) {
            tracing::warn!("Server sign-out failed (ignored): {}", message);
        }
        tracing::info!("Signed out {}", session.user.handle);
        Ok(())
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<()> {
    let email = email.trim();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(Error::Validation(format!("'{email}' is not a valid email")));
    }
    if password.is_empty() {
        return Err(Error::Validation("Password must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::RecordingNotifier;
    use crate::gateway::{Fault, MockBackend};
    use crate::storage::MemoryStore;
    use std::time::Duration;

    fn store() -> (
        SessionStore<MockBackend>,
        MockBackend,
        Arc<MemoryStore>,
        Arc<RecordingNotifier>,
    ) {
        let backend = MockBackend::new(Duration::ZERO);
        let storage = Arc::new(MemoryStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let store = SessionStore::new(backend.clone(), storage.clone(), notifier.clone());
        (store, backend, storage, notifier)
    }

    #[tokio::test]
    async fn sign_in_persists_and_publishes() {
        let (store, _, storage, notifier) = store();
        let receiver = store.subscribe();

        let session = store
            .sign_in("ada@example.com", "correct horse")
            .await
            .unwrap();
        assert_eq!(receiver.borrow().as_ref(), Some(&session));
        assert!(storage.get(SESSION_KEY).unwrap().is_some());
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn invalid_credentials_never_reach_gateway() {
        let (store, backend, _, notifier) = store();
        let error = store.sign_in("not-an-email", "pw").await.unwrap_err();
        assert!(matches!(error, Error::Validation(_)));
        assert_eq!(backend.calls(), 0);
        assert_eq!(notifier.len(), 1);
        assert_eq!(notifier.alerts()[0].kind, AlertKind::Warning);
    }

    #[tokio::test]
    async fn rejected_sign_in_alerts_once() {
        let (store, backend, _, notifier) = store();
        backend.fail_next(Fault::Offline);
        let error = store
            .sign_in("ada@example.com", "correct horse")
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Remote(_)));
        assert_eq!(notifier.len(), 1);
        assert_eq!(store.current(), None);
    }

    #[tokio::test]
    async fn restore_reads_persisted_session() {
        let (store, _, storage, _) = store();
        store
            .sign_in("grace@example.com", "correct horse")
            .await
            .unwrap();

        let restored = SessionStore::new(
            MockBackend::new(Duration::ZERO),
            storage,
            Arc::new(RecordingNotifier::default()),
        );
        let session = restored.restore().unwrap().unwrap();
        assert_eq!(session.user.handle, "grace");
        assert_eq!(restored.user().unwrap().handle, "grace");
    }

    #[tokio::test]
    async fn restore_discards_expired_session() {
        let (store, _, storage, _) = store();
        let expired = Session {
            user: UserSummary::from("ada"),
            token: "t".to_string(),
            expires_at: 0,
        };
        save_json(storage.as_ref(), SESSION_KEY, &expired).unwrap();

        assert_eq!(store.restore().unwrap(), None);
        assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn sign_out_clears_even_when_server_fails() {
        let (store, backend, storage, notifier) = store();
        store
            .sign_in("ada@example.com", "correct horse")
            .await
            .unwrap();
        backend.fail_next(Fault::Offline);

        store.sign_out().await.unwrap();
        assert_eq!(store.current(), None);
        assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
        assert!(notifier.is_empty());
    }

    #[test]
    fn credential_validation() {
        assert!(validate_credentials("ada@example.com", "x").is_ok());
        assert!(validate_credentials("@example.com", "x").is_err());
        assert!(validate_credentials("ada@localhost", "x").is_err());
        assert!(validate_credentials("ada@example.com", "").is_err());
    }
}
