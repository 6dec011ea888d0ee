//! Secret Distribution Service — automation HTTP surface.
//!
//! Configuration (environment variables):
//!   SECRETSVC_PORT             - Listen port (default: 3443)
//!   SECRETSVC_DATA_DIR         - Persistent data directory; in-memory store if unset
//!   SECRETSVC_MASTER_KEY_HEX   - 64 hex chars, the envelope master key (dev only)
//!   SECRETSVC_LOG_FORMAT       - "json" for structured logging, "pretty" for dev
//!   SECRETSVC_RATE_LIMIT_RPS   - Requests per second per IP (default: 20)
//!   SECRETSVC_RATE_LIMIT_BURST - Burst capacity per IP (default: 50)
//!
//! Authentication: the TLS-termination layer is out of scope here; this
//! binary trusts an `X-Client-Cert-Cn` header carrying the already
//! -verified peer certificate's Common Name.

use std::net::SocketAddr;
use std::sync::Arc;

use secret_api::state::{self, AppState, RateLimiter};
use secret_api::{middleware, routes};
use secret_core::{Authenticator, SecretService};
use secret_crypto::{Cryptographer, StaticMasterKey};
use secret_store::{DirectoryBackend, FileStore, InMemoryStore, IntegrityChainSink, SecretBackend, TracingAuditSink};
use tower_http::cors::{Any, CorsLayer};

fn master_key() -> StaticMasterKey {
    match std::env::var("SECRETSVC_MASTER_KEY_HEX") {
        Ok(hex) => StaticMasterKey::from_hex(&hex).expect("SECRETSVC_MASTER_KEY_HEX must be 64 hex chars"),
        Err(_) => {
            tracing::warn!("SECRETSVC_MASTER_KEY_HEX unset — using an ephemeral dev-only key");
            StaticMasterKey::new([0u8; 32])
        }
    }
}

#[tokio::main]
async fn main() {
    let log_format = std::env::var("SECRETSVC_LOG_FORMAT").unwrap_or_else(|_| "pretty".into());
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "secret_api=info,tower_http=info".into());
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).with_target(true).with_thread_ids(true).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let port: u16 = std::env::var("SECRETSVC_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3443);
    let rate_rps: f64 = std::env::var("SECRETSVC_RATE_LIMIT_RPS").ok().and_then(|v| v.parse().ok()).unwrap_or(20.0);
    let rate_burst: u32 = std::env::var("SECRETSVC_RATE_LIMIT_BURST").ok().and_then(|v| v.parse().ok()).unwrap_or(50);

    let (store, directory): (Arc<dyn SecretBackend>, Arc<dyn DirectoryBackend>) =
        match std::env::var("SECRETSVC_DATA_DIR") {
            Ok(dir) => {
                let fs = Arc::new(FileStore::open(&dir).expect("failed to open data directory"));
                tracing::info!(dir = %dir, "using file-backed store");
                (fs.clone(), fs)
            }
            Err(_) => {
                tracing::info!("SECRETSVC_DATA_DIR unset — using in-memory store");
                let mem = Arc::new(InMemoryStore::new());
                (mem.clone(), mem)
            }
        };

    let crypto = Cryptographer::new(master_key());
    let audit = Arc::new(IntegrityChainSink::new(Arc::new(TracingAuditSink)));
    let service = SecretService::new(store, directory.clone(), crypto, audit);
    let authenticator = Authenticator::new(directory);

    let state: state::Shared = Arc::new(AppState {
        service,
        authenticator,
        rate_limiter: RateLimiter::new(rate_rps, rate_burst),
    });

    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_state.rate_limiter.cleanup().await;
        }
    });

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let app = routes::router(state.clone())
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::auth_middleware))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::rate_limit_middleware))
        .layer(cors);

    tracing::info!(port, rate_rps, rate_burst, "starting secret distribution service");

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await.unwrap();
}
