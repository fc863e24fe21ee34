//! Client-side session and API access for the library-management backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! Front ends (the `libdesk` CLI, admin screens) talk to the REST backend
//! only through [`net::api::ApiClient`], and learn who is signed in only
//! through [`state::auth::SessionStore`]. The store owns the credential, its
//! persistence in [`storage`], and the redirects issued via [`navigate`].

pub mod config;
pub mod context;
pub mod navigate;
pub mod net;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use config::{ClientConfig, ConfigError};
pub use context::{UsageContractError, provide_session, try_use_session, use_session};
pub use navigate::{Navigator, Route};
pub use net::api::{ApiClient, ApiError, RequestOptions};
pub use net::types::{Credentials, Identity, RegistrationData, Role};
pub use state::auth::{AuthState, SessionError, SessionStore};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
