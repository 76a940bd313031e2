//! Integration tests for the FBAPI server.
//!
//! These tests require a running `fbapi-server` at `localhost:8080` that shares
//! the signing configuration of the test process. They are marked `#[ignore]`
//! so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! FBAPI_API_KEY=test-key FBAPI_PRIVATE_KEY=test-secret fbapi-server &
//! cargo test -p fbapi-integration -- --ignored
//! ```

use std::sync::Once;

use fbapi_auth::AuthProvider;
use fbapi_core::{HashAlgorithm, SigningAlgorithm, SigningConfig};

static INIT: Once = Once::new();

/// API key used when `FBAPI_API_KEY` is unset.
const DEFAULT_API_KEY: &str = "test-key";

/// HMAC secret used when no key material is configured.
const DEFAULT_SECRET: &str = "test-secret";

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("FBAPI_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:8080".to_owned())
}

/// Build a provider signing with the same configuration as the server.
///
/// # Panics
///
/// Panics if the signing configuration in the environment is invalid.
#[must_use]
pub fn auth_provider() -> AuthProvider {
    init_tracing();

    let api_key = std::env::var("FBAPI_API_KEY").unwrap_or_else(|_| DEFAULT_API_KEY.to_owned());
    let config = if std::env::var("FBAPI_PRIVATE_KEY").is_ok()
        || std::env::var("FBAPI_PRIVATE_KEY_FILE").is_ok()
    {
        SigningConfig::from_env().expect("valid signing configuration")
    } else {
        SigningConfig::new(SigningAlgorithm::Hmac, HashAlgorithm::Sha256)
            .expect("hmac with sha256 is supported")
            .with_private_key(DEFAULT_SECRET)
    };

    AuthProvider::new(api_key, config).expect("signing configuration has a private key")
}

/// Build a request carrying the given security headers.
#[must_use]
pub fn request(
    client: &reqwest::Client,
    method: reqwest::Method,
    path: &str,
    headers: &[(&'static str, String)],
    body: Option<&str>,
) -> reqwest::RequestBuilder {
    let mut builder = client.request(method, format!("{}{path}", endpoint_url()));
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    if let Some(body) = body {
        builder = builder
            .header("content-type", "application/json")
            .body(body.to_owned());
    }
    builder
}

#[cfg(test)]
mod tests {
    use reqwest::{Method, StatusCode};
    use serde_json::Value;

    use super::*;

    async fn error_code(response: reqwest::Response) -> String {
        let json: Value = response.json().await.unwrap();
        json["error"]["code"].as_str().unwrap_or_default().to_owned()
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_health_without_signature() {
        let client = reqwest::Client::new();
        let response = request(&client, Method::GET, "/health", &[], None)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_admit_signed_request_once() {
        let client = reqwest::Client::new();
        let provider = auth_provider();
        let path = "/accounts/1/orders?limit=5";
        let body = r#"{"amount":"10.5","asset":"BTC"}"#;
        let headers = provider
            .security_headers("POST", path, Some(body), None, None)
            .unwrap()
            .to_pairs();

        let response = request(&client, Method::POST, path, &headers, Some(body))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let echoed: Value = response.json().await.unwrap();
        assert_eq!(echoed["path"], path);
        assert_eq!(echoed["apiKey"], provider.api_key());
        assert_eq!(echoed["body"]["asset"], "BTC");

        let replay = request(&client, Method::POST, path, &headers, Some(body))
            .send()
            .await
            .unwrap();
        assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(replay).await, "NONCE_REUSED");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_tampered_query() {
        let client = reqwest::Client::new();
        let provider = auth_provider();
        let headers = provider
            .security_headers("GET", "/accounts?limit=5", None, None, None)
            .unwrap()
            .to_pairs();

        let response = request(&client, Method::GET, "/accounts?limit=500", &headers, None)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "INVALID_SIGNATURE");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_stale_request() {
        let client = reqwest::Client::new();
        let provider = auth_provider();
        let headers = provider
            .security_headers("GET", "/accounts", None, Some(1_600_000_000_000), None)
            .unwrap()
            .to_pairs();

        let response = request(&client, Method::GET, "/accounts", &headers, None)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "REQUEST_EXPIRED");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unsigned_request() {
        let client = reqwest::Client::new();
        let response = request(&client, Method::GET, "/accounts", &[], None)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "MISSING_HEADER");
    }
}
