//! Handlers for authenticated requests.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use serde_json::{Value, json};
use tracing::debug;

use crate::body::ApiResponseBody;
use crate::response::{ApiError, json_response};

/// A request that passed admission.
#[derive(Debug, Clone)]
pub struct AuthenticatedRequest {
    /// The API key the request was signed with.
    pub api_key: String,
    /// HTTP method.
    pub method: http::Method,
    /// Path including the query string.
    pub path: String,
    /// Raw request body.
    pub body: Bytes,
}

/// Future returned by [`ApiHandler::handle`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<ApiResponseBody>, ApiError>> + Send>>;

/// Business logic behind the authentication boundary.
pub trait ApiHandler: Send + Sync + 'static {
    /// Handle an authenticated request.
    fn handle(&self, request: AuthenticatedRequest) -> HandlerFuture;
}

/// Handler that echoes the authenticated request back as JSON.
///
/// ```json
/// {"method": "POST", "path": "/accounts", "apiKey": "key-1", "body": {"a": 1}}
/// ```
///
/// A body that is not JSON is echoed as a string; an empty body as `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl ApiHandler for EchoHandler {
    fn handle(&self, request: AuthenticatedRequest) -> HandlerFuture {
        Box::pin(async move {
            debug!(method = %request.method, path = %request.path, "echoing request");

            let body = if request.body.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&request.body).unwrap_or_else(|_| {
                    Value::String(String::from_utf8_lossy(&request.body).into_owned())
                })
            };

            let json = serde_json::to_vec(&json!({
                "method": request.method.as_str(),
                "path": request.path,
                "apiKey": request.api_key,
                "body": body,
            }))
            .map_err(|_| ApiError::internal())?;

            Ok(json_response(json))
        })
    }
}
