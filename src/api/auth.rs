use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};

use crate::api::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim())
    } else {
        None
    }
}

/// Writes require the configured bearer token, when one is configured
pub fn ensure_authorized(
    headers: &HeaderMap,
    state: &AppState,
) -> std::result::Result<(), (StatusCode, Json<Value>)> {
    let Some(expected) = state.auth_token.as_deref() else {
        return Ok(());
    };
    match bearer_token(headers) {
        Some(token) if token == expected => Ok(()),
        Some(_) => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "invalid bearer token" })),
        )),
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "missing bearer token" })),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ConfigService;
    use axum::http::HeaderValue;
    use std::sync::Arc;

    #[test]
    fn open_when_no_token_configured() {
        let state = AppState::new(Arc::new(ConfigService::new()));
        assert!(ensure_authorized(&HeaderMap::new(), &state).is_ok());
    }

    #[test]
    fn bearer_token_must_match() {
        let state = AppState::new(Arc::new(ConfigService::new())).with_auth_token(Some("s3cret"));

        let mut headers = HeaderMap::new();
        assert!(ensure_authorized(&headers, &state).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer wrong"));
        let (status, _) = ensure_authorized(&headers, &state).expect_err("wrong token");
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer s3cret"));
        assert!(ensure_authorized(&headers, &state).is_ok());
    }
}
