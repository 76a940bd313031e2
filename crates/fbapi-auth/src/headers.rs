//! Security header names, values, and accessors.
//!
//! A signed request carries four headers:
//!
//! | Header | Value |
//! |--------|-------|
//! | `X-FBAPI-KEY` | API key identifying the caller |
//! | `X-FBAPI-SIGNATURE` | URL-encoded, post-encoded signature |
//! | `X-FBAPI-TIMESTAMP` | milliseconds since the Unix epoch |
//! | `X-FBAPI-NONCE` | single-use token |
//!
//! Header lookups go through [`http::HeaderMap`] and are case-insensitive.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};

use crate::error::AuthError;

/// API key header.
pub const X_FBAPI_KEY: HeaderName = HeaderName::from_static("x-fbapi-key");
/// Signature header.
pub const X_FBAPI_SIGNATURE: HeaderName = HeaderName::from_static("x-fbapi-signature");
/// Timestamp header.
pub const X_FBAPI_TIMESTAMP: HeaderName = HeaderName::from_static("x-fbapi-timestamp");
/// Nonce header.
pub const X_FBAPI_NONCE: HeaderName = HeaderName::from_static("x-fbapi-nonce");

/// Display name of the API key header, used in error reports.
pub const KEY_PROPERTY: &str = "X-FBAPI-KEY";
/// Display name of the signature header.
pub const SIGNATURE_PROPERTY: &str = "X-FBAPI-SIGNATURE";
/// Display name of the timestamp header.
pub const TIMESTAMP_PROPERTY: &str = "X-FBAPI-TIMESTAMP";
/// Display name of the nonce header.
pub const NONCE_PROPERTY: &str = "X-FBAPI-NONCE";

/// Characters left unescaped in the signature header: alphanumerics and
/// `- _ . ! ~ * ' ( )`.
const SIGNATURE_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// URL-encode a post-encoded signature for transmission.
#[must_use]
pub fn url_encode_signature(signature: &[u8]) -> String {
    percent_encode(signature, SIGNATURE_ESCAPE).to_string()
}

/// Reverse [`url_encode_signature`].
#[must_use]
pub fn url_decode_signature(value: &str) -> Vec<u8> {
    percent_decode_str(value).collect()
}

/// The four header values attached to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityHeaders {
    /// API key identifying the caller.
    pub api_key: String,
    /// URL-encoded, post-encoded signature.
    pub signature: String,
    /// Request time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Single-use token.
    pub nonce: String,
}

impl SecurityHeaders {
    /// Attach the headers to `headers`, replacing any existing values.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidHeader`] if the API key or nonce contains
    /// characters not allowed in a header value.
    pub fn apply_to(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        headers.insert(X_FBAPI_KEY, header_value(&self.api_key, KEY_PROPERTY)?);
        headers.insert(
            X_FBAPI_SIGNATURE,
            header_value(&self.signature, SIGNATURE_PROPERTY)?,
        );
        headers.insert(X_FBAPI_TIMESTAMP, HeaderValue::from(self.timestamp));
        headers.insert(X_FBAPI_NONCE, header_value(&self.nonce, NONCE_PROPERTY)?);
        Ok(())
    }

    /// The headers as `(name, value)` pairs, for HTTP clients that take
    /// string pairs.
    #[must_use]
    pub fn to_pairs(&self) -> [(&'static str, String); 4] {
        [
            (KEY_PROPERTY, self.api_key.clone()),
            (SIGNATURE_PROPERTY, self.signature.clone()),
            (TIMESTAMP_PROPERTY, self.timestamp.to_string()),
            (NONCE_PROPERTY, self.nonce.clone()),
        ]
    }
}

fn header_value(value: &str, property: &'static str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value).map_err(|_| AuthError::InvalidHeader(property))
}

fn required<'a>(
    headers: &'a HeaderMap,
    name: &HeaderName,
    property: &'static str,
) -> Result<&'a str, AuthError> {
    let value = headers
        .get(name)
        .ok_or(AuthError::MissingHeader(property))?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader(property))?;

    if value.is_empty() {
        return Err(AuthError::MissingHeader(property));
    }
    Ok(value)
}

/// Read and parse the timestamp header.
///
/// # Errors
///
/// Returns [`AuthError::MissingHeader`] if absent or
/// [`AuthError::InvalidHeader`] if not a decimal integer.
pub fn timestamp_from(headers: &HeaderMap) -> Result<i64, AuthError> {
    required(headers, &X_FBAPI_TIMESTAMP, TIMESTAMP_PROPERTY)?
        .trim()
        .parse()
        .map_err(|_| AuthError::InvalidHeader(TIMESTAMP_PROPERTY))
}

/// Read the nonce header.
///
/// # Errors
///
/// Returns [`AuthError::MissingHeader`] if absent or empty.
pub fn nonce_from(headers: &HeaderMap) -> Result<&str, AuthError> {
    required(headers, &X_FBAPI_NONCE, NONCE_PROPERTY)
}

/// Read the API key header.
///
/// # Errors
///
/// Returns [`AuthError::MissingHeader`] if absent or empty.
pub fn api_key_from(headers: &HeaderMap) -> Result<&str, AuthError> {
    required(headers, &X_FBAPI_KEY, KEY_PROPERTY)
}

/// Read the raw (still URL-encoded) signature header.
///
/// # Errors
///
/// Returns [`AuthError::MissingHeader`] if absent or empty.
pub fn signature_from(headers: &HeaderMap) -> Result<&str, AuthError> {
    required(headers, &X_FBAPI_SIGNATURE, SIGNATURE_PROPERTY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SecurityHeaders {
        SecurityHeaders {
            api_key: "key-1".to_owned(),
            signature: url_encode_signature(b"ab+/cd=="),
            timestamp: 1_700_000_000_000,
            nonce: "n1".to_owned(),
        }
    }

    #[test]
    fn test_should_escape_base64_specials_like_encode_uri_component() {
        assert_eq!(url_encode_signature(b"ab+/cd=="), "ab%2B%2Fcd%3D%3D");
        let unreserved = "a-b_c.d!e~f*g'h(i)j";
        assert_eq!(url_encode_signature(unreserved.as_bytes()), unreserved);
        assert_eq!(url_encode_signature(b"a b"), "a%20b");
    }

    #[test]
    fn test_should_url_decode_binary_signature_losslessly() {
        let raw = [0x00, 0xff, b'%', b'+', 0x80];
        let encoded = url_encode_signature(&raw);
        assert!(encoded.is_ascii());
        assert_eq!(url_decode_signature(&encoded), raw);
    }

    #[test]
    fn test_should_apply_and_read_back_headers() {
        let mut headers = HeaderMap::new();
        sample().apply_to(&mut headers).unwrap();

        assert_eq!(api_key_from(&headers).unwrap(), "key-1");
        assert_eq!(signature_from(&headers).unwrap(), "ab%2B%2Fcd%3D%3D");
        assert_eq!(timestamp_from(&headers).unwrap(), 1_700_000_000_000);
        assert_eq!(nonce_from(&headers).unwrap(), "n1");
    }

    #[test]
    fn test_should_read_headers_case_insensitively() {
        let mut headers = HeaderMap::new();
        for (name, value) in sample().to_pairs() {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(&value).unwrap(),
            );
        }
        assert_eq!(api_key_from(&headers).unwrap(), "key-1");
    }

    #[test]
    fn test_should_report_missing_and_invalid_headers() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            timestamp_from(&headers),
            Err(AuthError::MissingHeader(TIMESTAMP_PROPERTY))
        ));
        assert!(matches!(
            nonce_from(&headers),
            Err(AuthError::MissingHeader(NONCE_PROPERTY))
        ));

        headers.insert(X_FBAPI_TIMESTAMP, HeaderValue::from_static("yesterday"));
        assert!(matches!(
            timestamp_from(&headers),
            Err(AuthError::InvalidHeader(TIMESTAMP_PROPERTY))
        ));

        headers.insert(X_FBAPI_KEY, HeaderValue::from_static(""));
        assert!(matches!(
            api_key_from(&headers),
            Err(AuthError::MissingHeader(KEY_PROPERTY))
        ));
    }

    #[test]
    fn test_should_reject_unrepresentable_header_values() {
        let mut headers = HeaderMap::new();
        let mut bad = sample();
        bad.nonce = "line\nbreak".to_owned();
        assert!(matches!(
            bad.apply_to(&mut headers),
            Err(AuthError::InvalidHeader(NONCE_PROPERTY))
        ));
    }
}
