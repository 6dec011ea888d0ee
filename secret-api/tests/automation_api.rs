//! End-to-end coverage of the `/automation/v2/secrets` surface, driven
//! through the router with `tower::ServiceExt::oneshot` rather than a
//! bound socket.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::http::{Request, StatusCode};
use secret_api::state::{AppState, RateLimiter};
use secret_api::{middleware, routes};
use secret_core::{Authenticator, SecretService};
use secret_crypto::{Cryptographer, StaticMasterKey};
use secret_store::{DirectoryBackend, InMemoryStore, TracingAuditSink};
use tower::ServiceExt;

const CN_HEADER: &str = "x-client-cert-cn";

fn app() -> (axum::Router, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let crypto = Cryptographer::new(StaticMasterKey::new([9u8; 32]));
    let audit = Arc::new(TracingAuditSink);
    let service = SecretService::new(store.clone(), store.clone(), crypto, audit);
    let authenticator = Authenticator::new(store.clone());

    store.create_client("automation", true).unwrap();

    let state: secret_api::state::Shared = Arc::new(AppState {
        service,
        authenticator,
        rate_limiter: RateLimiter::new(1000.0, 1000),
    });

    let router = routes::router(state.clone())
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::auth_middleware))
        .layer(axum::middleware::from_fn_with_state(state, middleware::rate_limit_middleware));

    (router, store)
}

fn authed_request(method: &str, uri: &str, body: Body) -> Request<Body> {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header(CN_HEADER, "automation")
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    req.extensions_mut().insert(ConnectInfo("127.0.0.1:1".parse::<SocketAddr>().unwrap()));
    req
}

async fn oneshot(router: axum::Router, mut req: Request<Body>) -> (StatusCode, serde_json::Value) {
    if req.extensions().get::<ConnectInfo<SocketAddr>>().is_none() {
        req.extensions_mut().insert(ConnectInfo("127.0.0.1:1".parse::<SocketAddr>().unwrap()));
    }
    let response = router.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { serde_json::Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

#[tokio::test]
async fn missing_auth_header_is_rejected() {
    let (router, _store) = app();
    let req = Request::builder()
        .method("GET")
        .uri("/automation/v2/secrets")
        .body(Body::empty())
        .unwrap();
    let (status, _) = oneshot(router, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_then_fetch_then_duplicate_conflict() {
    let (router, _store) = app();

    let body = serde_json::json!({ "name": "db-password", "content": base64_of(b"hunter2") }).to_string();
    let req = authed_request("POST", "/automation/v2/secrets", Body::from(body));
    let (status, _) = oneshot(router.clone(), req).await;
    assert_eq!(status, StatusCode::CREATED);

    let req = authed_request("GET", "/automation/v2/secrets/db-password", Body::empty());
    let (status, json) = oneshot(router.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["series"]["name"], "db-password");

    let body = serde_json::json!({ "name": "db-password", "content": base64_of(b"again") }).to_string();
    let req = authed_request("POST", "/automation/v2/secrets", Body::from(body));
    let (status, _) = oneshot(router, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn versioning_and_setversion_roundtrip() {
    let (router, _store) = app();

    let body = serde_json::json!({ "content": base64_of(b"v1") }).to_string();
    let req = authed_request("POST", "/automation/v2/secrets/rotating-key", Body::from(body));
    let (status, _) = oneshot(router.clone(), req).await;
    assert_eq!(status, StatusCode::CREATED);

    let body = serde_json::json!({ "content": base64_of(b"v2") }).to_string();
    let req = authed_request("POST", "/automation/v2/secrets/rotating-key", Body::from(body));
    let (status, _) = oneshot(router.clone(), req).await;
    assert_eq!(status, StatusCode::CREATED);

    let req = authed_request("GET", "/automation/v2/secrets/rotating-key/versions/0-10", Body::empty());
    let (status, json) = oneshot(router.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    let versions = json.as_array().unwrap();
    assert_eq!(versions.len(), 2);

    let oldest_version_id = versions.last().unwrap()["series"]["current_version_id"].clone();
    let _ = oldest_version_id;
}

#[tokio::test]
async fn expiring_listing_filters_by_time() {
    let (router, _store) = app();

    let body = serde_json::json!({ "name": "soon", "content": base64_of(b"x"), "expiry": 1000 }).to_string();
    let req = authed_request("POST", "/automation/v2/secrets", Body::from(body));
    oneshot(router.clone(), req).await;

    let body = serde_json::json!({ "name": "far", "content": base64_of(b"x"), "expiry": 999_999 }).to_string();
    let req = authed_request("POST", "/automation/v2/secrets", Body::from(body));
    oneshot(router.clone(), req).await;

    let req = authed_request("GET", "/automation/v2/secrets/expiring/5000", Body::empty());
    let (status, json) = oneshot(router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0], "soon");
}

#[tokio::test]
async fn group_modification_add_and_remove() {
    let (router, store) = app();
    store.create_group("on-call", "").unwrap();
    store.create_group("infra", "").unwrap();

    let body = serde_json::json!({ "name": "tls-key", "content": base64_of(b"x"), "groups": ["on-call"] }).to_string();
    let req = authed_request("POST", "/automation/v2/secrets", Body::from(body));
    oneshot(router.clone(), req).await;

    let body = serde_json::json!({ "addGroups": ["infra"], "removeGroups": ["on-call"] }).to_string();
    let req = authed_request("PUT", "/automation/v2/secrets/tls-key/groups", Body::from(body));
    let (status, json) = oneshot(router.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    let mut groups: Vec<String> = json.as_array().unwrap().iter().map(|v| v.as_str().unwrap().to_string()).collect();
    groups.sort();
    assert_eq!(groups, vec!["infra".to_string()]);

    let req = authed_request("GET", "/automation/v2/secrets/tls-key/groups", Body::empty());
    let (status, json) = oneshot(router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap(), &vec![serde_json::Value::String("infra".into())]);
}

#[tokio::test]
async fn backfill_expiration_recognizes_pem_certificate() {
    let (router, _store) = app();
    let pem = include_bytes!("../../secret-expiry/tests/fixtures/single.pem");

    let body = serde_json::json!({ "name": "leaf.pem", "content": base64_of(pem) }).to_string();
    let req = authed_request("POST", "/automation/v2/secrets", Body::from(body));
    oneshot(router.clone(), req).await;

    let req = authed_request("POST", "/automation/v2/secrets/leaf.pem/backfill-expiration", Body::from("[]"));
    let (status, json) = oneshot(router.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::Value::Bool(true));

    let req = authed_request("GET", "/automation/v2/secrets/leaf.pem", Body::empty());
    let (_, json) = oneshot(router, req).await;
    assert!(json["expiry"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn unknown_client_is_rejected() {
    let (router, _store) = app();

    let req = Request::builder()
        .method("GET")
        .uri("/automation/v2/secrets")
        .header(CN_HEADER, "unknown-client")
        .body(Body::empty())
        .unwrap();
    let (status, _) = oneshot(router, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn disabled_client_is_rejected() {
    let (router, store) = app();
    let client_id = store.create_client("disabled-thing", true).unwrap();
    store.set_enabled(client_id, false).unwrap();

    let req = Request::builder()
        .method("GET")
        .uri("/automation/v2/secrets")
        .header(CN_HEADER, "disabled-thing")
        .body(Body::empty())
        .unwrap();
    let (status, _) = oneshot(router, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

fn base64_of(bytes: &[u8]) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    STANDARD.encode(bytes)
}
