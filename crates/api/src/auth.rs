use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::routes::{ApiError, AppState};

pub const API_KEY_HEADER: &str = "x-api-key";

const LOGGED_KEY_PREFIX: usize = 8;

/// Rejects requests whose `X-API-KEY` (trimmed) does not match the configured key exactly.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or("");
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if provided.is_empty() {
        tracing::warn!(%method, %path, "request without API key");
        return ApiError::new("API key required", "X-API-KEY header not found").into_response();
    }

    if provided != state.api_key.as_ref() {
        let prefix: String = provided.chars().take(LOGGED_KEY_PREFIX).collect();
        tracing::warn!(%method, %path, provided_key = %format!("{prefix}..."), "request with invalid API key");
        return ApiError::new("Invalid API key", "the provided API key is not valid")
            .into_response();
    }

    tracing::debug!(%method, %path, "API key accepted");
    next.run(request).await
}
