//! Bearer-token extractors for session and password-setup tokens.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::debug;

use crate::auth::{Claims, TokenPurpose};
use crate::error::AppError;
use crate::handlers::http::AppState;

/// Extractor: signed-in user from a session JWT (Bearer token).
#[derive(Clone, Debug)]
pub struct AuthUser(pub Claims);

/// Extractor: holder of a password-setup JWT issued after a register/reset code was verified.
#[derive(Clone, Debug)]
pub struct SetupUser(pub Claims);

async fn bearer_claims(
    parts: &mut Parts,
    state: &AppState,
    purpose: TokenPurpose,
) -> Result<Claims, AppError> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                debug!(path = %parts.uri.path(), "rejected request: missing bearer token");
                AppError::Auth("Missing or invalid Authorization header".to_string())
            })?;
    state.jwt_secret().validate(bearer.token(), purpose)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        bearer_claims(parts, state, TokenPurpose::Session)
            .await
            .map(AuthUser)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for SetupUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        bearer_claims(parts, state, TokenPurpose::PasswordSetup)
            .await
            .map(SetupUser)
    }
}
