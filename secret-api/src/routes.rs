//! Handlers and router for `/automation/v2/secrets` (spec §6).

use axum::extract::{Extension, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use secret_core::CreateSecretRequest;

use crate::dto::{CreateOrUpdateSecretRequestDto, CreateSecretRequestDto, GroupsPatchRequestDto, SecretDetailDto, SetVersionRequestDto};
use crate::error::ApiErrorResponse;
use crate::middleware::AuthContext;
use crate::state::Shared;

pub fn router(state: Shared) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/automation/v2/secrets", secrets_router())
        .with_state(state)
}

fn secrets_router() -> Router<Shared> {
    Router::new()
        .route("/", post(create_secret).get(list_names))
        .route("/expiring/:time", get(list_expiring_names))
        .route("/expiring/v2/:time", get(list_expiring_sanitized))
        .route("/expiring/:time/:group", get(list_expiring_for_group))
        .route("/:name", post(create_or_update_secret).get(get_secret).delete(delete_secret))
        .route("/:name/versions/:range", get(get_versions))
        .route("/:name/setversion", post(set_version))
        .route("/:name/backfill-expiration", post(backfill_expiration))
        .route("/:name/groups", get(get_groups).put(put_groups))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_secret(
    State(state): State<Shared>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreateSecretRequestDto>,
) -> impl IntoResponse {
    let name = body.name.clone();
    let req = CreateSecretRequest {
        name: body.name,
        content_base64: body.content,
        description: body.description.unwrap_or_default(),
        metadata: body.metadata.unwrap_or_default(),
        secret_type: body.secret_type.unwrap_or_default(),
        expiry: body.expiry,
        groups: body.groups,
    };

    match state.service.create_secret(req, &auth.client_name) {
        Ok(_) => (
            StatusCode::CREATED,
            [(header::LOCATION, format!("/automation/v2/secrets/{}", name))],
        )
            .into_response(),
        Err(e) => ApiErrorResponse::from(e).into_response(),
    }
}

async fn create_or_update_secret(
    State(state): State<Shared>,
    Extension(auth): Extension<AuthContext>,
    Path(name): Path<String>,
    Json(body): Json<CreateOrUpdateSecretRequestDto>,
) -> impl IntoResponse {
    let req = CreateSecretRequest {
        name,
        content_base64: body.content,
        description: body.description.unwrap_or_default(),
        metadata: body.metadata.unwrap_or_default(),
        secret_type: body.secret_type.unwrap_or_default(),
        expiry: body.expiry,
        groups: vec![],
    };

    match state.service.create_or_update_secret(req, &auth.client_name) {
        Ok(_) => StatusCode::CREATED.into_response(),
        Err(e) => ApiErrorResponse::from(e).into_response(),
    }
}

async fn list_names(State(state): State<Shared>, Extension(_auth): Extension<AuthContext>) -> impl IntoResponse {
    match state.service.list_names() {
        Ok(names) => Json(names).into_response(),
        Err(e) => ApiErrorResponse::from(e).into_response(),
    }
}

async fn get_secret(
    State(state): State<Shared>,
    Extension(_auth): Extension<AuthContext>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.service.get_secret(&name) {
        Ok(secret) => Json(SecretDetailDto::from(secret)).into_response(),
        Err(e) => ApiErrorResponse::from(e).into_response(),
    }
}

async fn delete_secret(
    State(state): State<Shared>,
    Extension(auth): Extension<AuthContext>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.service.delete_secret(&name, &auth.client_name) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ApiErrorResponse::from(e).into_response(),
    }
}

async fn get_versions(
    State(state): State<Shared>,
    Extension(_auth): Extension<AuthContext>,
    Path((name, range)): Path<(String, String)>,
) -> impl IntoResponse {
    let Some((idx, count)) = range.split_once('-') else {
        return (StatusCode::BAD_REQUEST, "expected <idx>-<count>").into_response();
    };
    let (Ok(offset), Ok(count)) = (idx.parse::<usize>(), count.parse::<usize>()) else {
        return (StatusCode::BAD_REQUEST, "expected <idx>-<count>").into_response();
    };

    let series = match state.service.get_series(&name) {
        Ok(series) => series,
        Err(e) => return ApiErrorResponse::from(e).into_response(),
    };

    match state.service.get_versions(&name, offset, count) {
        Ok(versions) => {
            let dtos: Vec<SecretDetailDto> = versions
                .into_iter()
                .map(|content| SecretDetailDto::from(secret_store::Secret { series: series.clone(), current: content }))
                .collect();
            Json(dtos).into_response()
        }
        Err(e) => ApiErrorResponse::from(e).into_response(),
    }
}

async fn set_version(
    State(state): State<Shared>,
    Extension(auth): Extension<AuthContext>,
    Path(name): Path<String>,
    Json(body): Json<SetVersionRequestDto>,
) -> impl IntoResponse {
    match state.service.set_version(&name, body.version, &auth.client_name) {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => ApiErrorResponse::from(e).into_response(),
    }
}

async fn list_expiring_names(
    State(state): State<Shared>,
    Extension(_auth): Extension<AuthContext>,
    Path(time): Path<i64>,
) -> impl IntoResponse {
    match state.service.list_expiring_names(time) {
        Ok(names) => Json(names).into_response(),
        Err(e) => ApiErrorResponse::from(e).into_response(),
    }
}

async fn list_expiring_sanitized(
    State(state): State<Shared>,
    Extension(_auth): Extension<AuthContext>,
    Path(time): Path<i64>,
) -> impl IntoResponse {
    match state.service.list_expiring_sanitized(time) {
        Ok(secrets) => Json(secrets).into_response(),
        Err(e) => ApiErrorResponse::from(e).into_response(),
    }
}

async fn list_expiring_for_group(
    State(state): State<Shared>,
    Extension(_auth): Extension<AuthContext>,
    Path((time, group)): Path<(i64, String)>,
) -> impl IntoResponse {
    match state.service.list_expiring_names_for_group(time, &group) {
        Ok(names) => Json(names).into_response(),
        Err(e) => ApiErrorResponse::from(e).into_response(),
    }
}

async fn backfill_expiration(
    State(state): State<Shared>,
    Extension(auth): Extension<AuthContext>,
    Path(name): Path<String>,
    Json(passwords): Json<Vec<String>>,
) -> impl IntoResponse {
    match state.service.backfill_expiration(&name, &passwords, &auth.client_name) {
        Ok(found) => Json(found).into_response(),
        Err(e) => ApiErrorResponse::from(e).into_response(),
    }
}

async fn get_groups(
    State(state): State<Shared>,
    Extension(_auth): Extension<AuthContext>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.service.get_groups(&name) {
        Ok(groups) => Json(groups).into_response(),
        Err(e) => ApiErrorResponse::from(e).into_response(),
    }
}

async fn put_groups(
    State(state): State<Shared>,
    Extension(auth): Extension<AuthContext>,
    Path(name): Path<String>,
    Json(body): Json<GroupsPatchRequestDto>,
) -> impl IntoResponse {
    match state.service.modify_groups(&name, &body.add_groups, &body.remove_groups, &auth.client_name) {
        Ok(groups) => Json(groups).into_response(),
        Err(e) => ApiErrorResponse::from(e).into_response(),
    }
}
