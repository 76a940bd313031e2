//! Canonical message construction.
//!
//! The canonical message (prehash string) is the exact byte sequence that is
//! encoded and signed. It is the concatenation, with no separators, of:
//!
//! ```text
//! timestamp (decimal ms) + nonce + METHOD + path?query + body
//! ```
//!
//! where `body` is the empty string when the request carries none. Client and
//! server both call [`build_canonical_message`]; any divergence breaks every
//! signature.

use serde::Serialize;

use crate::error::AuthError;

/// Build the canonical message for a request.
///
/// `method` is upper-cased; every other component is used verbatim. `path`
/// must include the query string exactly as sent.
///
/// # Examples
///
/// ```
/// use fbapi_auth::canonical::build_canonical_message;
///
/// let message = build_canonical_message("get", "/accounts", None, 1_700_000_000_000, "abc123");
/// assert_eq!(message, "1700000000000abc123GET/accounts");
/// ```
#[must_use]
pub fn build_canonical_message(
    method: &str,
    path: &str,
    body: Option<&str>,
    timestamp_ms: i64,
    nonce: &str,
) -> String {
    let method = method.to_ascii_uppercase();
    let body = body.unwrap_or_default();
    format!("{timestamp_ms}{nonce}{method}{path}{body}")
}

/// The request components covered by a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedRequest<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// Request path including the query string.
    pub path: &'a str,
    /// Serialized body, `None` when the request has no body.
    pub body: Option<&'a str>,
    /// Request time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Single-use token.
    pub nonce: &'a str,
}

impl SignedRequest<'_> {
    /// The canonical message for this request.
    #[must_use]
    pub fn canonical_message(&self) -> String {
        build_canonical_message(
            self.method,
            self.path,
            self.body,
            self.timestamp,
            self.nonce,
        )
    }
}

/// Serialize a request body to the JSON text that must be both signed and
/// transmitted.
///
/// Output is compact and keeps struct field order, so the same value always
/// yields the same bytes.
///
/// # Errors
///
/// Returns [`AuthError::Serialization`] if `body` cannot be represented as JSON.
pub fn serialize_body<T: Serialize + ?Sized>(body: &T) -> Result<String, AuthError> {
    Ok(serde_json::to_string(body)?)
}

/// Interpret a received request body as canonical body text.
///
/// An empty body is treated as absent.
///
/// # Errors
///
/// Returns [`AuthError::InvalidBody`] if the body is not UTF-8.
pub fn body_text(body: &[u8]) -> Result<Option<&str>, AuthError> {
    if body.is_empty() {
        return Ok(None);
    }
    std::str::from_utf8(body)
        .map(Some)
        .map_err(|_| AuthError::InvalidBody)
}
