//! Client-side state shared across screens.

pub mod auth;
