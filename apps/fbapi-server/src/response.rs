//! Response serialization and authentication error mapping.

use fbapi_auth::AuthError;
use fbapi_auth::headers::{KEY_PROPERTY, NONCE_PROPERTY, SIGNATURE_PROPERTY, TIMESTAMP_PROPERTY};
use http::StatusCode;

use crate::body::ApiResponseBody;

/// Content type for all responses.
pub const CONTENT_TYPE: &str = "application/json";

/// An error reported to the client.
///
/// Serialized as:
///
/// ```json
/// {"error": {"code": "INVALID_SIGNATURE", "message": "...", "property": "X-FBAPI-SIGNATURE"}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status.
    pub status: StatusCode,
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// The offending request property, usually a header name.
    pub property: Option<&'static str>,
}

impl ApiError {
    fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        property: Option<&'static str>,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            property,
        }
    }

    /// A 500 response that does not reveal internal details.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "Internal server error",
            None,
        )
    }

    /// Map an admission failure to the response the client sees.
    #[must_use]
    pub fn from_auth(error: &AuthError) -> Self {
        if error.is_internal() {
            return Self::internal();
        }

        let message = error.to_string();
        match error {
            AuthError::MissingHeader(property) | AuthError::InvalidHeader(property) => {
                Self::for_header(*property, message)
            }
            AuthError::ApiKeyNotFound(_) => Self::new(
                StatusCode::UNAUTHORIZED,
                "INVALID_API_KEY",
                message,
                Some(KEY_PROPERTY),
            ),
            AuthError::NonceReused => Self::new(
                StatusCode::BAD_REQUEST,
                "NONCE_REUSED",
                message,
                Some(NONCE_PROPERTY),
            ),
            AuthError::RequestExpired => {
                Self::new(StatusCode::BAD_REQUEST, "REQUEST_EXPIRED", message, None)
            }
            AuthError::InvalidSignature
            | AuthError::InvalidEncoding { .. }
            | AuthError::InvalidBody => Self::new(
                StatusCode::BAD_REQUEST,
                "INVALID_SIGNATURE",
                message,
                Some(SIGNATURE_PROPERTY),
            ),
            _ => Self::internal(),
        }
    }

    fn for_header(property: &'static str, message: String) -> Self {
        match property {
            KEY_PROPERTY => Self::new(
                StatusCode::UNAUTHORIZED,
                "INVALID_API_KEY",
                message,
                Some(KEY_PROPERTY),
            ),
            SIGNATURE_PROPERTY => Self::new(
                StatusCode::BAD_REQUEST,
                "INVALID_SIGNATURE",
                message,
                Some(SIGNATURE_PROPERTY),
            ),
            NONCE_PROPERTY | TIMESTAMP_PROPERTY => Self::new(
                StatusCode::BAD_REQUEST,
                "MISSING_HEADER",
                message,
                Some(property),
            ),
            _ => Self::new(
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                message,
                Some(property),
            ),
        }
    }
}

/// Serialize an error into a JSON body.
#[must_use]
pub fn error_to_json(error: &ApiError) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "error": {
            "code": error.code,
            "message": error.message,
            "property": error.property,
        }
    }))
    .expect("JSON serialization of error cannot fail")
}

/// Convert an [`ApiError`] into a complete HTTP response.
#[must_use]
pub fn error_to_response(error: &ApiError) -> http::Response<ApiResponseBody> {
    http::Response::builder()
        .status(error.status)
        .header("content-type", CONTENT_TYPE)
        .body(ApiResponseBody::from_json(error_to_json(error)))
        .expect("valid error response")
}

/// Build a success response from JSON bytes.
#[must_use]
pub fn json_response(json: Vec<u8>) -> http::Response<ApiResponseBody> {
    http::Response::builder()
        .status(StatusCode::OK)
        .header("content-type", CONTENT_TYPE)
        .body(ApiResponseBody::from_json(json))
        .expect("valid JSON response")
}
