//! Rate limiting and authentication middleware.
//!
//! The TLS termination layer that extracts the peer certificate's CN is
//! out of scope; this trusts an `X-Client-Cert-Cn` header as the
//! already-extracted identity, set by the (out-of-scope) TLS proxy in
//! front of this service.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::ApiError;
use crate::state::Shared;

pub const CLIENT_CN_HEADER: &str = "x-client-cert-cn";

#[derive(Clone, Debug)]
pub struct AuthContext {
    pub client_name: String,
}

pub async fn rate_limit_middleware(
    State(state): State<Shared>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> impl IntoResponse {
    if req.uri().path() == "/health" {
        return next.run(req).await.into_response();
    }

    if !state.rate_limiter.check(addr.ip()).await {
        tracing::warn!(ip = %addr.ip(), path = %req.uri().path(), "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "1")],
            Json(ApiError { error: "rate limit exceeded".into() }),
        )
            .into_response();
    }

    next.run(req).await.into_response()
}

pub async fn auth_middleware(State(state): State<Shared>, mut req: Request, next: Next) -> impl IntoResponse {
    if req.uri().path() == "/health" {
        return next.run(req).await.into_response();
    }

    let cn = req
        .headers()
        .get(CLIENT_CN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let Some(cn) = cn else {
        return (StatusCode::UNAUTHORIZED, Json(ApiError { error: format!("missing {} header", CLIENT_CN_HEADER) }))
            .into_response();
    };

    match state.authenticator.authenticate_automation(&cn) {
        Ok(client) => {
            req.extensions_mut().insert(AuthContext { client_name: client.name });
            next.run(req).await.into_response()
        }
        Err(e) => crate::error::ApiErrorResponse::from(e).into_response(),
    }
}
