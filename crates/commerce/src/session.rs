//! Authentication session state machine.
//!
//! Owns the current user, the bearer token (via [`CredentialProvider`] and
//! the persistence layer), and the session status. Drives login,
//! registration, logout, and boot-time session restoration.
//!
//! # Ordering guarantees
//!
//! - The token is installed into the credential provider *before* the
//!   `Authenticated` state becomes observable, so a request issued
//!   immediately after observing `Authenticated` carries the right header.
//! - `logout` clears the persisted token and the credential provider
//!   synchronously, before its first await, so a concurrently issued
//!   request cannot pick up the stale token.
//!
//! # Concurrency
//!
//! Overlapping `login`/`register` calls are not serialized: the last call
//! to resolve wins the status/user/token, deterministically. State lives
//! behind a `std::sync::RwLock` that is never held across an await.

use std::sync::{Arc, PoisonError, RwLock};

use crate::api::{ApiClient, ApiError, AuthResponse, LoginRequest, RegisterRequest, User};
use crate::credentials::CredentialProvider;
use crate::storage::{Storage, StorageExt, keys};

const LOGIN_FALLBACK: &str = "Unable to sign in. Please try again.";
const REGISTER_FALLBACK: &str = "Unable to create your account. Please try again.";
const RESTORE_FALLBACK: &str = "Your session has expired. Please sign in again.";

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No session; the default state.
    #[default]
    Unauthenticated,
    /// A persisted token is being verified against the backend.
    Restoring,
    /// A login or registration call is in flight.
    Authenticating,
    /// A user is signed in.
    Authenticated,
    /// No session, with a display message explaining why the last attempt
    /// failed. Recoverable; equivalent to `Unauthenticated` otherwise.
    Error(String),
}

impl SessionStatus {
    /// Whether this status represents a signed-in session.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

/// A cloned, read-only view of the session for UI code.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Current status.
    pub status: SessionStatus,
    /// Current user; present exactly when `status` is `Authenticated`.
    pub user: Option<User>,
}

impl SessionSnapshot {
    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.status.is_authenticated()
    }

    /// The display message from the last failed attempt, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            SessionStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Default)]
struct SessionState {
    status: SessionStatus,
    user: Option<User>,
}

/// The authentication session manager.
///
/// Cheaply cloneable; clones share the same session. The manager is the
/// only writer of the credential provider it was built with.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    state: RwLock<SessionState>,
    storage: Arc<dyn Storage>,
    credentials: CredentialProvider,
    api: ApiClient,
}

impl SessionManager {
    /// Create a session manager in the `Unauthenticated` state.
    ///
    /// `credentials` must be the same provider the `api` client reads from.
    #[must_use]
    pub fn new(
        api: ApiClient,
        credentials: CredentialProvider,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(SessionState::default()),
                storage,
                credentials,
                api,
            }),
        }
    }

    /// A cloned view of the current status and user.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        SessionSnapshot {
            status: state.status.clone(),
            user: state.user.clone(),
        }
    }

    /// Restore a persisted session at startup.
    ///
    /// With no persisted token this settles immediately in
    /// `Unauthenticated`. With one, the token is installed and verified
    /// against `GET /auth/me`; any failure tears the token down everywhere
    /// and lands in `Error` - stale sessions are recoverable, never fatal.
    pub async fn restore_session(&self) {
        let token = self
            .inner
            .storage
            .load::<String>(keys::TOKEN)
            .filter(|t| !t.is_empty());

        let Some(token) = token else {
            self.set_state(SessionStatus::Unauthenticated, None);
            return;
        };

        self.inner.credentials.set(&token);
        self.set_state(SessionStatus::Restoring, None);

        match self.inner.api.me().await {
            Ok(user) => {
                tracing::debug!(user = %user.id, "session restored");
                self.set_state(SessionStatus::Authenticated, Some(user));
            }
            Err(err) => {
                tracing::warn!(error = %err, "session restore failed, discarding token");
                self.discard_token();
                self.set_state(
                    SessionStatus::Error(err.display_message(RESTORE_FALLBACK)),
                    None,
                );
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// On success the token is persisted and installed before the
    /// `Authenticated` state is published, and the full backend response is
    /// returned. On failure any previously installed token is discarded,
    /// the server's message (or a generic fallback) lands in the session
    /// status, and the error is returned so the caller can react.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ApiError`] when the backend rejects the
    /// credentials or the call fails.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.set_state(SessionStatus::Authenticating, None);

        match self.inner.api.login(request).await {
            Ok(response) => {
                self.complete_authentication(&response);
                Ok(response)
            }
            Err(err) => {
                self.fail_authentication(&err, LOGIN_FALLBACK);
                Err(err)
            }
        }
    }

    /// Create an account; registration implies login.
    ///
    /// Identical contract to [`login`](Self::login) against
    /// `POST /auth/register`.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ApiError`] when registration fails.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.set_state(SessionStatus::Authenticating, None);

        match self.inner.api.register(request).await {
            Ok(response) => {
                self.complete_authentication(&response);
                Ok(response)
            }
            Err(err) => {
                self.fail_authentication(&err, REGISTER_FALLBACK);
                Err(err)
            }
        }
    }

    /// Sign out.
    ///
    /// Local teardown (persisted token, credential provider, in-memory
    /// state) happens synchronously before the backend call is issued, and
    /// succeeds unconditionally; a failed server-side logout is logged and
    /// ignored.
    pub async fn logout(&self) {
        self.discard_token();
        self.set_state(SessionStatus::Unauthenticated, None);

        if let Err(err) = self.inner.api.logout().await {
            tracing::warn!(error = %err, "server-side logout failed, session cleared locally");
        }
    }

    /// Install or clear a token delivered out of band (e.g. an
    /// identity-provider redirect callback).
    ///
    /// Installing does not change the session status; callers follow up
    /// with [`restore_session`](Self::restore_session) to resolve the user.
    /// Clearing performs the same local teardown as logout.
    pub fn set_token(&self, token: Option<&str>) {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => self.install_token(token),
            None => {
                self.discard_token();
                self.set_state(SessionStatus::Unauthenticated, None);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist and install the token, then publish the authenticated state.
    fn complete_authentication(&self, response: &AuthResponse) {
        // Header binding before the state transition is observable.
        self.install_token(&response.token);
        tracing::debug!(user = %response.user.id, "authenticated");
        self.set_state(SessionStatus::Authenticated, Some(response.user.clone()));
    }

    /// Tear down any previously installed token and publish the error.
    ///
    /// `Error` means "no session": a failed re-login must not leave an older
    /// credential installed while the status reports no user.
    fn fail_authentication(&self, err: &ApiError, fallback: &str) {
        self.discard_token();
        self.set_state(SessionStatus::Error(err.display_message(fallback)), None);
    }

    fn install_token(&self, token: &str) {
        if let Err(err) = self.inner.storage.save(keys::TOKEN, token) {
            tracing::warn!(error = %err, "failed to persist session token");
        }
        self.inner.credentials.set(token);
    }

    fn discard_token(&self) {
        self.inner.storage.remove(keys::TOKEN);
        self.inner.credentials.clear();
    }

    fn set_state(&self, status: SessionStatus, user: Option<User>) {
        let mut state = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        state.status = status;
        state.user = user;
    }
}
