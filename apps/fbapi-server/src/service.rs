//! HTTP service implementing the hyper `Service` trait.
//!
//! Every request except `GET /health` passes through the
//! [`AdmissionGate`] before it reaches the [`ApiHandler`]. Rejections are
//! mapped to JSON error responses by [`ApiError::from_auth`].

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use fbapi_auth::gate::{AdmissionGate, IncomingRequest};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use tracing::{error, warn};

use crate::body::ApiResponseBody;
use crate::handler::{ApiHandler, AuthenticatedRequest};
use crate::response::{ApiError, error_to_response, json_response};

/// Hyper `Service` that authenticates requests and dispatches them to a
/// handler.
#[derive(Debug)]
pub struct ApiHttpService<H: ApiHandler> {
    handler: Arc<H>,
    gate: Arc<AdmissionGate>,
}

impl<H: ApiHandler> ApiHttpService<H> {
    /// Create a new service.
    pub fn new(handler: Arc<H>, gate: Arc<AdmissionGate>) -> Self {
        Self { handler, gate }
    }
}

impl<H: ApiHandler> Clone for ApiHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<H: ApiHandler> hyper::service::Service<http::Request<Incoming>> for ApiHttpService<H> {
    type Response = http::Response<ApiResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let gate = Arc::clone(&self.gate);
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            let (parts, incoming) = req.into_parts();
            let response = match incoming.collect().await {
                Ok(collected) => {
                    process_request(parts, collected.to_bytes(), &gate, handler.as_ref()).await
                }
                Err(e) => {
                    error!(error = %e, "failed to read request body");
                    error_to_response(&ApiError::internal())
                }
            };
            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Run a buffered request through admission and the handler.
pub async fn process_request<H: ApiHandler>(
    parts: http::request::Parts,
    body: Bytes,
    gate: &AdmissionGate,
    handler: &H,
) -> http::Response<ApiResponseBody> {
    if is_health_check(&parts.method, parts.uri.path()) {
        return health_check_response();
    }

    let path = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path(), http::uri::PathAndQuery::as_str);

    let verdict = gate.admit(&IncomingRequest {
        method: parts.method.as_str(),
        path,
        headers: &parts.headers,
        body: &body,
    });

    let admitted = match verdict {
        Ok(admitted) => admitted,
        Err(rejection) => {
            if rejection.error.is_internal() {
                error!(
                    state = %rejection.state,
                    error = %rejection.error,
                    method = %parts.method,
                    path = %path,
                    "request admission failed"
                );
            } else {
                warn!(
                    state = %rejection.state,
                    error = %rejection.error,
                    method = %parts.method,
                    path = %path,
                    "request rejected"
                );
            }
            return error_to_response(&ApiError::from_auth(&rejection.error));
        }
    };

    let request = AuthenticatedRequest {
        api_key: admitted.api_key,
        method: parts.method.clone(),
        path: path.to_owned(),
        body,
    };

    match handler.handle(request).await {
        Ok(response) => response,
        Err(err) => error_to_response(&err),
    }
}

/// Check if the request is a health check.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && path == "/health"
}

fn health_check_response() -> http::Response<ApiResponseBody> {
    json_response(br#"{"status":"running"}"#.to_vec())
}

/// Add common response headers.
fn add_common_headers(
    mut response: http::Response<ApiResponseBody>,
    request_id: &str,
) -> http::Response<ApiResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry("x-request-id").or_insert(hv);
    }
    headers.insert("server", http::HeaderValue::from_static("fbapi-server"));

    response
}

#[cfg(test)]
mod tests {
    use fbapi_auth::{AuthProvider, NonceStore, SignatureVerifier, StaticKeyStore};
    use fbapi_core::{HashAlgorithm, SigningAlgorithm, SigningConfig};
    use serde_json::Value;

    use super::*;
    use crate::handler::EchoHandler;

    const RSA_PRIVATE: &str = include_str!("../../../crates/fbapi-auth/testdata/rsa_private.pem");
    const RSA_PUBLIC: &str = include_str!("../../../crates/fbapi-auth/testdata/rsa_public.pem");

    fn hmac_config() -> SigningConfig {
        SigningConfig::new(SigningAlgorithm::Hmac, HashAlgorithm::Sha256)
            .unwrap()
            .with_private_key("secret")
    }

    fn gate_for(config: SigningConfig, verification_key: &str) -> AdmissionGate {
        AdmissionGate::new(
            SignatureVerifier::new(config),
            Arc::new(StaticKeyStore::new(vec![(
                "key-1".to_owned(),
                verification_key.to_owned(),
            )])),
            Arc::new(NonceStore::new()),
            30,
        )
    }

    fn signed_parts(
        provider: &AuthProvider,
        method: &str,
        path: &str,
        body: Option<&str>,
        timestamp: Option<i64>,
    ) -> http::request::Parts {
        let security = provider
            .security_headers(method, path, body, timestamp, None)
            .unwrap();
        let (mut parts, ()) = http::Request::builder()
            .method(method)
            .uri(path)
            .body(())
            .unwrap()
            .into_parts();
        security.apply_to(&mut parts.headers).unwrap();
        parts
    }

    async fn send(
        gate: &AdmissionGate,
        parts: http::request::Parts,
        body: &'static str,
    ) -> (http::StatusCode, Value) {
        let body = Bytes::from_static(body.as_bytes());
        let response = process_request(parts, body, gate, &EchoHandler).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_should_bypass_auth_for_health_check() {
        let gate = gate_for(hmac_config(), "secret");
        let (parts, ()) = http::Request::builder()
            .uri("/health")
            .body(())
            .unwrap()
            .into_parts();

        let (status, json) = send(&gate, parts, "").await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(json["status"], "running");
    }

    #[tokio::test]
    async fn test_should_echo_authenticated_request_then_reject_replay() {
        let gate = gate_for(hmac_config(), "secret");
        let provider = AuthProvider::new("key-1", hmac_config()).unwrap();
        let body = r#"{"a":1}"#;
        let path = "/accounts/123/orders?dry=1";
        let parts = signed_parts(&provider, "POST", path, Some(body), None);
        let replay = parts.clone();

        let (status, json) = send(&gate, parts, body).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(json["apiKey"], "key-1");
        assert_eq!(json["path"], path);
        assert_eq!(json["body"]["a"], 1);

        let (status, json) = send(&gate, replay, body).await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "NONCE_REUSED");
        assert_eq!(json["error"]["property"], "X-FBAPI-NONCE");
    }

    #[tokio::test]
    async fn test_should_reject_tampered_body_with_invalid_signature() {
        let gate = gate_for(hmac_config(), "secret");
        let provider = AuthProvider::new("key-1", hmac_config()).unwrap();
        let signed_body = Some(r#"{"a":1}"#);
        let parts = signed_parts(&provider, "POST", "/accounts", signed_body, None);

        let (status, json) = send(&gate, parts, r#"{"a":2}"#).await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "INVALID_SIGNATURE");
        assert_eq!(json["error"]["property"], "X-FBAPI-SIGNATURE");
    }

    #[tokio::test]
    async fn test_should_reject_unknown_api_key_with_401() {
        let gate = gate_for(hmac_config(), "secret");
        let provider = AuthProvider::new("key-2", hmac_config()).unwrap();
        let parts = signed_parts(&provider, "GET", "/accounts", None, None);

        let (status, json) = send(&gate, parts, "").await;
        assert_eq!(status, http::StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "INVALID_API_KEY");
        assert_eq!(json["error"]["property"], "X-FBAPI-KEY");
    }

    #[tokio::test]
    async fn test_should_reject_expired_request() {
        let gate = gate_for(hmac_config(), "secret");
        let provider = AuthProvider::new("key-1", hmac_config()).unwrap();
        let stale = Some(1_700_000_000_000);
        let parts = signed_parts(&provider, "GET", "/accounts", None, stale);

        let (status, json) = send(&gate, parts, "").await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "REQUEST_EXPIRED");
    }

    #[tokio::test]
    async fn test_should_reject_unsigned_request_at_timestamp_gate() {
        let gate = gate_for(hmac_config(), "secret");
        let (parts, ()) = http::Request::builder()
            .uri("/accounts")
            .body(())
            .unwrap()
            .into_parts();

        let (status, json) = send(&gate, parts, "").await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["property"], "X-FBAPI-TIMESTAMP");
    }

    #[tokio::test]
    async fn test_should_authenticate_rsa_signed_request() {
        let config = SigningConfig::new(SigningAlgorithm::Rsa, HashAlgorithm::Sha512)
            .unwrap()
            .with_private_key(RSA_PRIVATE);
        let gate = gate_for(config.clone(), RSA_PUBLIC);
        let provider = AuthProvider::new("key-1", config).unwrap();
        let parts = signed_parts(&provider, "DELETE", "/accounts/9", None, None);

        let (status, json) = send(&gate, parts, "").await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(json["method"], "DELETE");
    }

    #[tokio::test]
    async fn test_should_map_broken_key_material_to_500() {
        let config = SigningConfig::new(SigningAlgorithm::Rsa, HashAlgorithm::Sha256)
            .unwrap()
            .with_private_key(RSA_PRIVATE);
        let gate = gate_for(config.clone(), "not a key");
        let provider = AuthProvider::new("key-1", config).unwrap();
        let parts = signed_parts(&provider, "GET", "/accounts", None, None);

        let (status, json) = send(&gate, parts, "").await;
        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
    }

    #[test]
    fn test_should_add_common_headers() {
        let response = add_common_headers(json_response(b"{}".to_vec()), "req-1");
        assert_eq!(response.headers().get("x-request-id").unwrap(), "req-1");
        assert_eq!(response.headers().get("server").unwrap(), "fbapi-server");
    }
}
