//! Authenticated pass-through to the Jira REST API with the service account's credentials.

use axum::{
    body::{Body, Bytes},
    extract::{Path, RawQuery, State},
    http::{header::CONTENT_TYPE, Method},
    response::Response,
};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::handlers::http::AppState;
use crate::middleware::AuthUser;

const ALLOWED_PREFIXES: &[&str] = &["rest/api/", "rest/agile/"];

/// Relative upstream path for a proxied request, or a validation error.
///
/// Only REST API paths pass, and no segment may climb out of them.
pub fn normalize_proxy_path(raw: &str) -> AppResult<String> {
    let path = raw.trim_start_matches('/');
    let lowered = path.to_ascii_lowercase();
    let escapes = path.contains('\\')
        || lowered.contains("%2e")
        || lowered.contains("%2f")
        || path.split('/').any(|segment| segment == ".." || segment == ".");
    if escapes || !ALLOWED_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return Err(AppError::Validation(format!("Path not allowed: {}", raw)));
    }
    Ok(path.to_string())
}

/// ANY /api/proxy/*path
pub async fn proxy(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> AppResult<Response> {
    let path = normalize_proxy_path(&path)?;
    let body = (method != Method::GET && method != Method::HEAD && !body.is_empty()).then_some(body);

    let upstream = state
        .jira()
        .forward(method, &path, query.as_deref(), body)
        .await?;
    let status = upstream.status();
    let content_type = upstream.headers().get(CONTENT_TYPE).cloned();
    let bytes = upstream.bytes().await?;
    debug!(user = %claims.sub, %path, %status, len = bytes.len(), "proxied");

    let mut response = Response::builder().status(status);
    if let Some(content_type) = content_type {
        response = response.header(CONTENT_TYPE, content_type);
    }
    response
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.into()))
}
