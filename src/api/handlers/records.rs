use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::api::{auth::ensure_authorized, state::AppState};
use crate::domain::ConfigEntityKind;
use crate::services::ServiceError;

fn service_error(err: ServiceError) -> Response {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err.body())).into_response()
}

fn parse_body(kind: ConfigEntityKind, body: &Bytes) -> std::result::Result<Value, Response> {
    serde_json::from_slice(body).map_err(|e| {
        debug!(kind = %kind, error = %e, "malformed request body");
        service_error(ServiceError::BadRequest(format!("malformed JSON: {}", e)))
    })
}

/// GET /api/{collection}
pub async fn list_records(State(state): State<AppState>, kind: ConfigEntityKind) -> Json<Value> {
    Json(state.service.list(kind).await)
}

/// GET /api/{collection}/:key
pub async fn get_record(
    State(state): State<AppState>,
    kind: ConfigEntityKind,
    Path(key): Path<String>,
) -> Response {
    match state.service.get(kind, &key).await {
        Some(record) => Json(record).into_response(),
        None => service_error(ServiceError::NotFound { kind, key }),
    }
}

/// POST /api/{collection} (insert or replace), PUT on singleton paths
pub async fn upsert_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    kind: ConfigEntityKind,
    body: Bytes,
) -> Response {
    if let Err(rejection) = ensure_authorized(&headers, &state) {
        return rejection.into_response();
    }
    let payload = match parse_body(kind, &body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.service.upsert(kind, &payload).await {
        Ok(record) => Json(record).into_response(),
        Err(err) => service_error(err),
    }
}

/// PUT /api/{collection}/:key
pub async fn replace_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    kind: ConfigEntityKind,
    Path(key): Path<String>,
    body: Bytes,
) -> Response {
    if let Err(rejection) = ensure_authorized(&headers, &state) {
        return rejection.into_response();
    }
    let payload = match parse_body(kind, &body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.service.replace(kind, &key, &payload).await {
        Ok(record) => Json(record).into_response(),
        Err(err) => service_error(err),
    }
}

/// Fallback for paths outside the route table
pub async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "not found" })))
}
