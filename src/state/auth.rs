//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Used by route guards and user-aware screens to coordinate login redirects
//! and identity-dependent rendering. [`SessionStore`] is the single writer of
//! the stored credential; everything else observes it.
//!
//! DESIGN
//! ======
//! States are Anonymous (`user: None`) and Authenticated. Login writes the
//! credential and identity as one storage record before publishing the new
//! state, and navigation always comes last. Operations on one store run one
//! at a time: a second login issued while the first is in flight waits for
//! it rather than racing it.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::navigate::{Navigator, Route};
use crate::net::api::{ApiClient, ApiError, RequestOptions};
use crate::net::signin::{AuthResponseError, parse_signin_response};
use crate::net::types::{Credentials, Identity, RegistrationData};
use crate::storage::{SessionRecord, StorageError};

/// Observable authentication state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<Identity>,
    /// True while a login or registration call is in flight.
    pub loading: bool,
}

impl AuthState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Whether a protected screen should bounce to `/login`.
#[must_use]
pub fn should_redirect_unauth(state: &AuthState) -> bool {
    !state.loading && state.user.is_none()
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backend call failed; shown to the user as-is.
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    AuthResponse(#[from] AuthResponseError),
    #[error("failed to persist session: {0}")]
    Storage(#[from] StorageError),
}

/// Owns the authentication lifecycle. Clones are handles to the same store.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    api: ApiClient,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<AuthState>,
    op_lock: Mutex<()>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("api", &self.inner.api)
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Build a store over `api`'s storage and rehydrate any saved session.
    ///
    /// The saved identity is trusted as-is; a revoked credential surfaces as
    /// a 401 on the next backend call.
    pub fn new(api: ApiClient, navigator: Arc<dyn Navigator>) -> Self {
        let user = SessionRecord::load(api.storage().as_ref()).map(|record| record.user);
        match &user {
            Some(identity) => tracing::debug!(user_id = identity.id, "rehydrated session"),
            None => tracing::debug!("no saved session"),
        }
        let (state, _) = watch::channel(AuthState { user, loading: false });
        Self { inner: Arc::new(Inner { api, navigator, state, op_lock: Mutex::new(()) }) }
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// The stored bearer token, if any.
    #[must_use]
    pub fn credential(&self) -> Option<String> {
        SessionRecord::load(self.inner.api.storage().as_ref()).map(|record| record.token)
    }

    /// Watch for state changes. The receiver starts at the current state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Sign in via `POST /auth/signin`, persist the session, and go home.
    ///
    /// # Errors
    ///
    /// Backend rejections come back as [`SessionError::Api`] unchanged. A
    /// payload without a usable token or identity is
    /// [`SessionError::AuthResponse`]. On any error, state and storage are
    /// left as they were.
    pub async fn login(&self, credentials: &Credentials) -> Result<Identity, SessionError> {
        let _op = self.inner.op_lock.lock().await;
        self.set_loading(true);

        match self.sign_in(credentials).await {
            Ok(identity) => {
                self.inner.state.send_replace(AuthState { user: Some(identity.clone()), loading: false });
                tracing::info!(user_id = identity.id, user = %identity.display_name, "signed in");
                self.inner.navigator.navigate(Route::Home);
                Ok(identity)
            }
            Err(e) => {
                self.set_loading(false);
                tracing::warn!(email = %credentials.email, error = %e, "sign-in failed");
                Err(e)
            }
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, SessionError> {
        let payload =
            self.inner.api.request("/auth/signin", RequestOptions::post().with_json(credentials)?).await?;
        let (token, user) = parse_signin_response(&payload)?;
        SessionRecord { token, user: user.clone() }.save(self.inner.api.storage().as_ref())?;
        Ok(user)
    }

    /// Create an account via `POST /auth/signup`, then go to `/login`.
    ///
    /// Does not sign the new user in. `data.role` is forwarded untouched.
    ///
    /// # Errors
    ///
    /// Backend rejections come back as [`SessionError::Api`] unchanged.
    pub async fn register(&self, data: &RegistrationData) -> Result<(), SessionError> {
        let _op = self.inner.op_lock.lock().await;
        self.set_loading(true);

        let result = match RequestOptions::post().with_json(data) {
            Ok(options) => self.inner.api.request("/auth/signup", options).await,
            Err(e) => Err(e),
        };
        self.set_loading(false);

        match result {
            Ok(_) => {
                tracing::info!(email = %data.email, role = ?data.role, "registered");
                self.inner.navigator.navigate(Route::Login);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(email = %data.email, error = %e, "registration failed");
                Err(e.into())
            }
        }
    }

    /// Drop the session everywhere and go to `/login`. Never fails; calling
    /// it again is a no-op apart from the redirect.
    pub async fn logout(&self) {
        let _op = self.inner.op_lock.lock().await;
        if let Err(e) = SessionRecord::clear(self.inner.api.storage().as_ref()) {
            tracing::warn!(error = %e, "failed to clear stored session");
        }
        let previous = self.inner.state.send_replace(AuthState::default());
        if let Some(identity) = previous.user {
            tracing::info!(user_id = identity.id, "signed out");
        }
        self.inner.navigator.navigate(Route::Login);
    }

    /// Route guard: returns `true` when `route` may be shown. Otherwise
    /// redirects to `/login` and returns `false`.
    pub fn guard(&self, route: Route) -> bool {
        if route.is_public() || !should_redirect_unauth(&self.state()) {
            return true;
        }
        tracing::debug!(%route, "unauthenticated; redirecting to login");
        self.inner.navigator.navigate(Route::Login);
        false
    }

    fn set_loading(&self, loading: bool) {
        self.inner.state.send_if_modified(|state| {
            let changed = state.loading != loading;
            state.loading = loading;
            changed
        });
    }
}
