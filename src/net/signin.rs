//! Adapter from the loosely-shaped `/auth/signin` payload to typed session
//! values.
//!
//! The backend has shipped the token under different names over time. The
//! probe order is fixed: `jwt`, then `token`, then `accessToken`; the first
//! non-empty string wins.

#[cfg(test)]
#[path = "signin_test.rs"]
mod signin_test;

use std::collections::BTreeSet;

use serde_json::Value;

use super::types::Identity;

/// Token field names, in probe order.
pub const TOKEN_FIELDS: [&str; 3] = ["jwt", "token", "accessToken"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthResponseError {
    #[error("sign-in response carried no token (expected one of jwt, token, accessToken)")]
    MissingToken,
    #[error("sign-in response is missing `{0}`")]
    MissingField(&'static str),
    #[error("sign-in response field `{0}` has an unexpected type")]
    InvalidField(&'static str),
}

/// Pick the bearer token out of a sign-in payload.
#[must_use]
pub fn extract_token(payload: &Value) -> Option<&str> {
    TOKEN_FIELDS
        .iter()
        .filter_map(|field| payload.get(field).and_then(Value::as_str))
        .find(|token| !token.is_empty())
}

/// Split a sign-in payload into its credential and identity.
///
/// # Errors
///
/// Fails when no token field is usable or the identity fields are missing
/// or mistyped. A missing `roles` array is read as no roles.
pub fn parse_signin_response(payload: &Value) -> Result<(String, Identity), AuthResponseError> {
    let token = extract_token(payload).ok_or(AuthResponseError::MissingToken)?;

    let id = match payload.get("id") {
        None | Some(Value::Null) => return Err(AuthResponseError::MissingField("id")),
        Some(v) => v.as_i64().ok_or(AuthResponseError::InvalidField("id"))?,
    };
    let display_name = match payload.get("username") {
        None | Some(Value::Null) => return Err(AuthResponseError::MissingField("username")),
        Some(v) => v.as_str().ok_or(AuthResponseError::InvalidField("username"))?.to_owned(),
    };
    let roles = match payload.get("roles") {
        None | Some(Value::Null) => BTreeSet::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(ToOwned::to_owned))
            .collect::<Option<BTreeSet<_>>>()
            .ok_or(AuthResponseError::InvalidField("roles"))?,
        Some(_) => return Err(AuthResponseError::InvalidField("roles")),
    };

    Ok((token.to_owned(), Identity { id, display_name, roles }))
}
