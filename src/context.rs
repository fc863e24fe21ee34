//! Scoped access to the session store.
//!
//! A host provides one [`SessionStore`] to a tree of work with
//! [`provide_session`]; code inside the tree reaches it with
//! [`use_session`]. Reaching for it outside any scope is a wiring bug, so
//! the accessor panics instead of handing back a default store.

#[cfg(test)]
#[path = "context_test.rs"]
mod context_test;

use std::future::Future;

use crate::state::auth::SessionStore;

tokio::task_local! {
    static SESSION: SessionStore;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("use_session must be called within provide_session")]
pub struct UsageContractError;

/// Run `future` with `store` available to [`use_session`].
pub async fn provide_session<F: Future>(store: SessionStore, future: F) -> F::Output {
    SESSION.scope(store, future).await
}

/// The store provided to the current scope.
///
/// # Errors
///
/// Returns [`UsageContractError`] outside [`provide_session`].
pub fn try_use_session() -> Result<SessionStore, UsageContractError> {
    SESSION.try_with(SessionStore::clone).map_err(|_| UsageContractError)
}

/// The store provided to the current scope.
///
/// # Panics
///
/// Panics outside [`provide_session`].
#[must_use]
pub fn use_session() -> SessionStore {
    match try_use_session() {
        Ok(store) => store,
        Err(e) => panic!("{e}"),
    }
}
