//! Identity session service
//!
//! Holds the current authenticated user and publishes every change over a
//! watch channel. The expense store reads the session from a receiver, so a
//! sign-in or sign-out is observed without any further wiring.

use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::result::{Error, Result};
use crate::domain::{Session, SignUpOutcome, User};
use crate::ports::IdentityProvider;

/// Snapshot of the identity session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub session: Option<Session>,
    /// True while a sign-in, sign-up or sign-out is in flight
    pub loading: bool,
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }
}

/// Service managing the current session
pub struct SessionService {
    provider: Arc<dyn IdentityProvider>,
    state: watch::Sender<SessionState>,
}

impl SessionService {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self { provider, state }
    }

    /// Receiver that observes every session change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Current session, if present and not expired
    pub fn current(&self) -> Option<Session> {
        self.state
            .borrow()
            .session
            .clone()
            .filter(|s| !s.is_expired())
    }

    pub fn current_user(&self) -> Option<User> {
        self.current().map(|s| s.user)
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_modify(|s| s.loading = loading);
    }

    fn set_session(&self, session: Option<Session>) {
        self.state.send_modify(|s| {
            s.session = session;
            s.loading = false;
        });
    }

    /// Install a previously persisted session. Expired sessions are dropped
    /// and reported as `false`.
    pub fn restore(&self, session: Session) -> bool {
        if session.is_expired() {
            self.set_session(None);
            return false;
        }
        self.set_session(Some(session));
        true
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(Error::auth("Email and password are required"));
        }

        self.set_loading(true);
        match self.provider.sign_in(email, password).await {
            Ok(session) => {
                self.set_session(Some(session.clone()));
                Ok(session)
            }
            Err(e) => {
                self.set_loading(false);
                Err(e)
            }
        }
    }

    /// Create an account. When the backend signs the user in straight away
    /// the session is installed; a pending confirmation leaves it untouched.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<SignUpOutcome> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(Error::auth("Email and password are required"));
        }
        if username.trim().is_empty() {
            return Err(Error::auth("Username is required"));
        }

        self.set_loading(true);
        match self.provider.sign_up(email, password, username.trim()).await {
            Ok(outcome) => {
                match &outcome {
                    SignUpOutcome::SignedIn { session } => self.set_session(Some(session.clone())),
                    SignUpOutcome::ConfirmationPending { .. } => self.set_loading(false),
                }
                Ok(outcome)
            }
            Err(e) => {
                self.set_loading(false);
                Err(e)
            }
        }
    }

    /// End the session. The local session is cleared even when the backend
    /// call fails; the failure is still returned.
    pub async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.state.borrow().session.clone() else {
            return Ok(());
        };

        self.set_loading(true);
        let result = if session.is_expired() {
            Ok(())
        } else {
            self.provider.sign_out(&session).await
        };
        self.set_session(None);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryBackend;
    use chrono::{Duration, Utc};

    async fn service_with_user() -> (SessionService, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        backend.register("ann@example.com", "secret1", Some("ann")).await;
        (SessionService::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_sign_in_publishes_session() {
        let (service, _) = service_with_user().await;
        let mut rx = service.subscribe();

        service.sign_in("ann@example.com", "secret1").await.unwrap();

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.user().unwrap().email, "ann@example.com");
        assert!(!state.loading);
        assert_eq!(service.current_user().unwrap().display_name(), "ann");
    }

    #[tokio::test]
    async fn test_sign_in_failure_keeps_signed_out() {
        let (service, _) = service_with_user().await;

        let err = service.sign_in("ann@example.com", "nope").await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        assert!(service.current().is_none());
        assert!(!service.is_loading());
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected_before_request() {
        let (service, _) = service_with_user().await;
        let err = service.sign_in("  ", "secret1").await.unwrap_err();
        assert_eq!(err.message(), "Email and password are required");

        let err = service.sign_up("new@example.com", "secret1", " ").await.unwrap_err();
        assert_eq!(err.message(), "Username is required");
    }

    #[tokio::test]
    async fn test_sign_up_signs_in() {
        let (service, _) = service_with_user().await;
        let outcome = service
            .sign_up("bob@example.com", "secret2", "bob")
            .await
            .unwrap();
        assert!(matches!(outcome, SignUpOutcome::SignedIn { .. }));
        assert_eq!(service.current_user().unwrap().username.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_sign_up_pending_confirmation_leaves_session_empty() {
        let backend = Arc::new(MemoryBackend::new().requiring_confirmation());
        let service = SessionService::new(backend);
        let outcome = service
            .sign_up("bob@example.com", "secret2", "bob")
            .await
            .unwrap();
        assert!(matches!(outcome, SignUpOutcome::ConfirmationPending { .. }));
        assert!(service.current().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let (service, _) = service_with_user().await;
        service.sign_in("ann@example.com", "secret1").await.unwrap();

        service.sign_out().await.unwrap();
        assert!(service.current().is_none());

        // Signing out again is a no-op
        service.sign_out().await.unwrap();
    }

    #[tokio::test]
    async fn test_restore_rejects_expired_session() {
        let (service, _) = service_with_user().await;
        let user = User::new("u-1", "ann@example.com");

        let expired = Session::new(user.clone(), "tok")
            .expiring_in(Utc::now() - Duration::hours(2), 3600);
        assert!(!service.restore(expired));
        assert!(service.current().is_none());

        let valid = Session::new(user, "tok").expiring_in(Utc::now(), 3600);
        assert!(service.restore(valid));
        assert!(service.current().is_some());
    }
}
