use std::sync::Mutex as StdMutex;

use super::*;
use crate::storage::{MemoryStorage, SESSION_KEY, Storage};
use crate::test_support::{RecordingNavigator, dead_backend, spawn_backend};

use axum::Json;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};

// =============================================================================
// fixtures
// =============================================================================

type Seen = Arc<StdMutex<Vec<Value>>>;

/// Fake auth backend. `secret` is the only accepted password; signup
/// rejects `taken@x.com`.
fn auth_backend(seen: Seen) -> axum::Router {
    let signin_seen = seen.clone();
    let signup_seen = seen;
    axum::Router::new()
        .route(
            "/auth/signin",
            post(move |Json(body): Json<Value>| async move {
                signin_seen.lock().unwrap().push(body.clone());
                signin_response(&body)
            }),
        )
        .route(
            "/auth/signup",
            post(move |Json(body): Json<Value>| async move {
                signup_seen.lock().unwrap().push(body.clone());
                if body["email"] == "taken@x.com" {
                    return (StatusCode::BAD_REQUEST, Json(json!({ "message": "Error: Email is already in use!" })))
                        .into_response();
                }
                Json(json!({ "message": "User registered successfully!" })).into_response()
            }),
        )
        .route(
            "/whoami",
            get(|headers: HeaderMap| async move {
                match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                    Some(auth) => Json(json!({ "authorization": auth })).into_response(),
                    None => StatusCode::UNAUTHORIZED.into_response(),
                }
            }),
        )
}

fn signin_response(body: &Value) -> Response {
    match (body["email"].as_str(), body["password"].as_str()) {
        (Some("a@x.com"), Some("secret")) => {
            Json(json!({ "id": 1, "username": "a@x.com", "roles": ["reader"], "token": "abc123" })).into_response()
        }
        (Some("lib@x.com"), Some("secret")) => Json(json!({
            "id": 2, "username": "lib@x.com", "roles": ["librarian", "reader"], "accessToken": "lib-token",
        }))
        .into_response(),
        (Some("notoken@x.com"), Some("secret")) => {
            Json(json!({ "id": 3, "username": "notoken@x.com", "roles": [] })).into_response()
        }
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Bad credentials" }))).into_response(),
    }
}

struct Harness {
    store: SessionStore,
    storage: Arc<MemoryStorage>,
    nav: Arc<RecordingNavigator>,
    seen: Seen,
    base: String,
}

impl Harness {
    async fn new() -> Self {
        let seen = Seen::default();
        let base = spawn_backend(auth_backend(seen.clone())).await;
        Self::with(base, Arc::new(MemoryStorage::new()), seen)
    }

    fn with(base: String, storage: Arc<MemoryStorage>, seen: Seen) -> Self {
        let nav = RecordingNavigator::new();
        let api = ApiClient::new(base.clone(), storage.clone());
        let store = SessionStore::new(api, nav.clone());
        Self { store, storage, nav, seen, base }
    }

    /// A second store over the same storage, as after a process restart.
    fn restart(&self) -> Self {
        Self::with(self.base.clone(), self.storage.clone(), self.seen.clone())
    }

    fn stored(&self) -> Option<String> {
        self.storage.get_item(SESSION_KEY).unwrap()
    }
}

fn good() -> Credentials {
    Credentials::new("a@x.com", "secret")
}

fn reader_identity() -> Identity {
    Identity { id: 1, display_name: "a@x.com".to_owned(), roles: ["reader".to_owned()].into() }
}

fn registration(email: &str, role: Option<crate::net::types::Role>) -> RegistrationData {
    RegistrationData {
        first_name: "Ada".to_owned(),
        last_name: "Lovelace".to_owned(),
        email: email.to_owned(),
        password: "pw".to_owned(),
        role,
    }
}

// =============================================================================
// should_redirect_unauth
// =============================================================================

#[test]
fn should_redirect_unauth_when_not_loading_and_user_missing() {
    let state = AuthState { user: None, loading: false };
    assert!(should_redirect_unauth(&state));
}

#[test]
fn should_not_redirect_while_loading() {
    let state = AuthState { user: None, loading: true };
    assert!(!should_redirect_unauth(&state));
}

#[test]
fn should_not_redirect_when_user_exists() {
    let state = AuthState { user: Some(reader_identity()), loading: false };
    assert!(!should_redirect_unauth(&state));
}

// =============================================================================
// login
// =============================================================================

#[tokio::test]
async fn login_success_authenticates_and_persists() {
    let h = Harness::new().await;
    assert!(!h.store.is_authenticated());

    let identity = h.store.login(&good()).await.unwrap();

    assert_eq!(identity, reader_identity());
    assert_eq!(h.store.identity(), Some(reader_identity()));
    assert_eq!(h.store.credential().as_deref(), Some("abc123"));
    assert!(!h.store.state().loading);
    assert_eq!(h.nav.routes(), vec![Route::Home]);
}

#[tokio::test]
async fn login_sends_email_and_password() {
    let h = Harness::new().await;
    h.store.login(&good()).await.unwrap();
    assert_eq!(*h.seen.lock().unwrap(), vec![json!({ "email": "a@x.com", "password": "secret" })]);
}

#[tokio::test]
async fn login_accepts_alternate_token_field() {
    let h = Harness::new().await;
    let identity = h.store.login(&Credentials::new("lib@x.com", "secret")).await.unwrap();
    assert!(identity.has_role("librarian"));
    assert_eq!(h.store.credential().as_deref(), Some("lib-token"));
}

#[tokio::test]
async fn login_rejection_propagates_message_and_changes_nothing() {
    let h = Harness::new().await;

    let err = h.store.login(&Credentials::new("a@x.com", "wrong")).await.unwrap_err();

    assert!(matches!(&err, SessionError::Api(ApiError::Status { status: 401, .. })), "got {err:?}");
    assert_eq!(err.to_string(), "Bad credentials");
    assert_eq!(h.store.state(), AuthState::default());
    assert_eq!(h.stored(), None);
    assert!(h.nav.routes().is_empty());
}

#[tokio::test]
async fn login_rejection_keeps_existing_session() {
    let h = Harness::new().await;
    h.store.login(&good()).await.unwrap();
    let before = h.stored();

    h.store.login(&Credentials::new("a@x.com", "wrong")).await.unwrap_err();

    assert_eq!(h.store.identity(), Some(reader_identity()));
    assert_eq!(h.stored(), before);
}

#[tokio::test]
async fn login_without_token_fails_and_stores_nothing() {
    let h = Harness::new().await;
    let err = h.store.login(&Credentials::new("notoken@x.com", "secret")).await.unwrap_err();
    assert!(matches!(err, SessionError::AuthResponse(AuthResponseError::MissingToken)));
    assert_eq!(h.stored(), None);
    assert!(!h.store.is_authenticated());
}

#[tokio::test]
async fn login_network_failure_is_reported() {
    let base = dead_backend().await;
    let h = Harness::with(base, Arc::new(MemoryStorage::new()), Seen::default());
    let err = h.store.login(&good()).await.unwrap_err();
    assert!(matches!(err, SessionError::Api(ApiError::Network(_))));
    assert_eq!(h.store.state(), AuthState::default());
}

#[tokio::test]
async fn login_as_other_user_replaces_identity() {
    let h = Harness::new().await;
    h.store.login(&good()).await.unwrap();
    h.store.login(&Credentials::new("lib@x.com", "secret")).await.unwrap();
    assert_eq!(h.store.identity().map(|i| i.id), Some(2));
    assert_eq!(h.store.credential().as_deref(), Some("lib-token"));
}

#[tokio::test]
async fn credential_is_attached_after_login() {
    let h = Harness::new().await;
    let anon = h.store.api().request("/whoami", RequestOptions::get()).await.unwrap_err();
    assert!(anon.is_unauthorized());

    h.store.login(&good()).await.unwrap();
    let me = h.store.api().request("/whoami", RequestOptions::get()).await.unwrap();
    assert_eq!(me["authorization"], "Bearer abc123");
}

#[tokio::test]
async fn concurrent_logins_both_complete() {
    let h = Harness::new().await;
    let first = good();
    let other = Credentials::new("lib@x.com", "secret");
    let (a, b) = tokio::join!(h.store.login(&first), h.store.login(&other));
    a.unwrap();
    b.unwrap();

    let record = SessionRecord::load(&*h.storage).unwrap();
    assert_eq!(Some(record.user), h.store.identity());
    assert_eq!(h.nav.routes(), vec![Route::Home, Route::Home]);
}

// =============================================================================
// subscribe
// =============================================================================

#[tokio::test]
async fn subscribers_see_login_and_logout() {
    let h = Harness::new().await;
    let mut rx = h.store.subscribe();
    assert_eq!(*rx.borrow_and_update(), AuthState::default());

    h.store.login(&good()).await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().user, Some(reader_identity()));

    h.store.logout().await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), AuthState::default());
}

// =============================================================================
// register
// =============================================================================

#[tokio::test]
async fn register_forwards_payload_and_redirects_to_login() {
    let h = Harness::new().await;
    h.store.register(&registration("ada@x.com", Some(crate::net::types::Role::Admin))).await.unwrap();

    let seen = h.seen.lock().unwrap().clone();
    assert_eq!(seen[0]["firstName"], "Ada");
    assert_eq!(seen[0]["role"], "admin");
    assert_eq!(h.nav.routes(), vec![Route::Login]);
    assert!(!h.store.is_authenticated());
    assert_eq!(h.stored(), None);
}

#[tokio::test]
async fn register_without_role_omits_it() {
    let h = Harness::new().await;
    h.store.register(&registration("ada@x.com", None)).await.unwrap();
    let seen = h.seen.lock().unwrap().clone();
    assert!(seen[0].get("role").is_none());
}

#[tokio::test]
async fn register_rejection_propagates() {
    let h = Harness::new().await;
    let err = h.store.register(&registration("taken@x.com", None)).await.unwrap_err();
    assert_eq!(err.to_string(), "Error: Email is already in use!");
    assert!(h.nav.routes().is_empty());
    assert!(!h.store.state().loading);
}

#[tokio::test]
async fn register_does_not_touch_existing_session() {
    let h = Harness::new().await;
    h.store.login(&good()).await.unwrap();
    h.store.register(&registration("ada@x.com", None)).await.unwrap();
    assert_eq!(h.store.identity(), Some(reader_identity()));
    assert_eq!(h.store.credential().as_deref(), Some("abc123"));
}

// =============================================================================
// logout
// =============================================================================

#[tokio::test]
async fn logout_clears_everything_and_redirects() {
    let h = Harness::new().await;
    h.store.login(&good()).await.unwrap();

    h.store.logout().await;

    assert_eq!(h.store.state(), AuthState::default());
    assert_eq!(h.store.credential(), None);
    assert_eq!(h.stored(), None);
    assert_eq!(h.nav.routes(), vec![Route::Home, Route::Login]);
}

#[tokio::test]
async fn logout_twice_is_same_as_once() {
    let h = Harness::new().await;
    h.store.login(&good()).await.unwrap();

    h.store.logout().await;
    let (state, stored) = (h.store.state(), h.stored());
    h.store.logout().await;

    assert_eq!(h.store.state(), state);
    assert_eq!(h.stored(), stored);
}

#[tokio::test]
async fn logout_when_anonymous_still_redirects() {
    let h = Harness::new().await;
    h.store.logout().await;
    assert_eq!(h.nav.routes(), vec![Route::Login]);
    assert_eq!(h.storage.get_item(SESSION_KEY).unwrap(), None);
}

// =============================================================================
// rehydration
// =============================================================================

#[tokio::test]
async fn identity_survives_restart() {
    let h = Harness::new().await;
    let identity = h.store.login(&good()).await.unwrap();

    let restarted = h.restart();
    assert_eq!(restarted.store.identity(), Some(identity));
    assert_eq!(restarted.store.credential().as_deref(), Some("abc123"));
    assert!(restarted.nav.routes().is_empty());
}

#[tokio::test]
async fn logout_survives_restart() {
    let h = Harness::new().await;
    h.store.login(&good()).await.unwrap();
    h.store.logout().await;
    assert!(!h.restart().store.is_authenticated());
}

#[tokio::test]
async fn malformed_saved_session_starts_anonymous() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set_item(SESSION_KEY, "{\"token\":").unwrap();
    let h = Harness::with(dead_backend().await, storage, Seen::default());
    assert_eq!(h.store.state(), AuthState::default());
}

// =============================================================================
// guard
// =============================================================================

#[tokio::test]
async fn guard_blocks_protected_routes_when_anonymous() {
    let h = Harness::new().await;
    assert!(h.store.guard(Route::Home));
    assert!(!h.store.guard(Route::AdminBooks));
    assert_eq!(h.nav.routes(), vec![Route::Login]);
}

#[tokio::test]
async fn guard_allows_protected_routes_when_signed_in() {
    let h = Harness::new().await;
    h.store.login(&good()).await.unwrap();
    assert!(h.store.guard(Route::AdminUsers));
    assert_eq!(h.nav.routes(), vec![Route::Home]);
}
