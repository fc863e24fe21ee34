//! Networking: the REST client and the backend's wire schema.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` owns request/response handling, `signin` adapts the auth payload
//! into typed session values, `resources` wraps the admin endpoints, and
//! `types` defines the shared DTOs.

pub mod api;
pub mod resources;
pub mod signin;
pub mod types;
