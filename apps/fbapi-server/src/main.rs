//! FBAPI Server - stub API server that only admits FBAPI-signed requests.
//!
//! Every request other than `GET /health` must carry the four `X-FBAPI-*`
//! security headers. Requests are checked for freshness, nonce reuse, a known
//! API key, and a valid signature, in that order, before they reach the echo
//! handler.
//!
//! # Usage
//!
//! ```text
//! FBAPI_API_KEY=key-1 FBAPI_PRIVATE_KEY=secret fbapi-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `FBAPI_API_KEY` | *(required)* | API key clients present in `X-FBAPI-KEY` |
//! | `FBAPI_SIGNING_ALGORITHM` | `hmac` | `hmac`, `rsa` or `ecdsa` |
//! | `FBAPI_HASH_ALGORITHM` | `sha256` | `sha256`, `sha512` or `sha3-256` |
//! | `FBAPI_PRIVATE_KEY` / `FBAPI_PRIVATE_KEY_FILE` | *(none)* | HMAC secret or private PEM |
//! | `FBAPI_PUBLIC_KEY` / `FBAPI_PUBLIC_KEY_FILE` | *(none)* | Client public PEM for RSA/ECDSA |
//! | `FBAPI_PRE_ENCODING` | `plain` | Encoding applied to the canonical message |
//! | `FBAPI_POST_ENCODING` | `base64` | Encoding applied to the raw signature |
//! | `FBAPI_REQUEST_TTL` | `30` | Maximum request age in seconds |
//! | `FBAPI_NONCE_RETENTION` | `forever` | `forever` or `ttl` |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod body;
mod handler;
mod response;
mod service;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fbapi_auth::keys::derive_public_key_pem;
use fbapi_auth::timestamp::{now_millis, window_start};
use fbapi_auth::{AdmissionGate, NonceStore, SignatureVerifier, StaticKeyStore};
use fbapi_core::{NonceRetention, ServerConfig, SigningAlgorithm, SigningConfig};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::handler::EchoHandler;
use crate::service::ApiHttpService;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Interval between nonce purges when retention is `ttl`.
const PURGE_INTERVAL: Duration = Duration::from_secs(10);

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Resolve the key signatures are verified against.
///
/// A configured public key wins. Without one, HMAC verifies with the shared
/// secret and RSA/ECDSA fall back to the public half of the private key,
/// which only makes sense when the server and client share a key pair.
fn verification_key(config: &SigningConfig) -> Result<String> {
    if let Some(public) = config.public_key() {
        return Ok(public.to_owned());
    }

    let private = config
        .private_key()
        .context("no FBAPI_PUBLIC_KEY or FBAPI_PRIVATE_KEY configured")?;

    if config.signing_algorithm() != SigningAlgorithm::Hmac {
        warn!(
            signing_algorithm = %config.signing_algorithm(),
            "no public key configured, deriving it from the private key"
        );
    }

    derive_public_key_pem(config.signing_algorithm(), private)
        .context("failed to derive public key from FBAPI_PRIVATE_KEY")
}

/// Periodically drop nonces that can no longer pass the timestamp gate.
fn spawn_nonce_purger(nonces: Arc<NonceStore>, ttl_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = nonces.purge_older_than(window_start(ttl_secs, now_millis()));
            if purged > 0 {
                debug!(purged, remaining = nonces.len(), "purged expired nonces");
            }
        }
    });
}

async fn serve(listener: TcpListener, service: ApiHttpService<EchoHandler>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let server_config = ServerConfig::from_env().context("invalid server configuration")?;

    init_tracing(&server_config.log_level)?;

    let signing_config = SigningConfig::from_env().context("invalid signing configuration")?;

    info!(
        listen = %server_config.listen,
        signing_algorithm = %signing_config.signing_algorithm(),
        hash_algorithm = %signing_config.hash_algorithm(),
        pre_encoding = %signing_config.pre_encoding(),
        post_encoding = %signing_config.post_encoding(),
        request_ttl_secs = server_config.request_ttl_secs,
        nonce_retention = ?server_config.nonce_retention,
        version = VERSION,
        "starting FBAPI server",
    );

    let key_store = StaticKeyStore::new([(
        server_config.api_key.clone(),
        verification_key(&signing_config)?,
    )]);
    let nonces = Arc::new(NonceStore::new());

    if server_config.nonce_retention == NonceRetention::Ttl {
        spawn_nonce_purger(Arc::clone(&nonces), server_config.request_ttl_secs);
    }

    let gate = AdmissionGate::new(
        SignatureVerifier::new(signing_config),
        Arc::new(key_store),
        nonces,
        server_config.request_ttl_secs,
    );
    let service = ApiHttpService::new(Arc::new(EchoHandler), Arc::new(gate));

    let addr: SocketAddr = server_config
        .listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", server_config.listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
