//! Auth HTTP handlers: request code, verify code, password login, set password, session.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::auth::{AuthAppService, Claims, DEFAULT_ROLE};
use crate::db::UserRow;
use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::middleware::{AppJson, AuthUser, SetupUser};

/// What the caller wants out of a verified code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    Login,
    Register,
    Reset,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OtpRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub otp: String,
    #[serde(default)]
    pub auth_type: AuthType,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetPasswordRequest {
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub email: String,
    pub role: String,
}

impl From<Claims> for UserInfo {
    fn from(claims: Claims) -> Self {
        Self {
            email: claims.sub,
            role: claims.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct OtpSentResponse {
    pub sent: bool,
    pub expires_in_seconds: i64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerifyOtpResponse {
    /// `login`: the code opened a session.
    Authenticated(LoginResponse),
    /// `register` / `reset`: the code only allows choosing a password.
    OtpVerified { setup_token: String },
}

fn session_response(state: &AppState, email: &str) -> Result<LoginResponse, AppError> {
    let token = state.jwt_secret().issue_session(email)?;
    Ok(LoginResponse {
        token,
        user: UserInfo {
            email: email.to_string(),
            role: DEFAULT_ROLE.to_string(),
        },
    })
}

/// Normalized, well-formed and approved, or an error.
fn admit_email(state: &AppState, raw: &str) -> Result<String, AppError> {
    let email = AuthAppService::normalize_email(raw);
    AuthAppService::validate_email(&email)?;
    state.domain_policy.check(&email)?;
    Ok(email)
}

/// POST /auth/otp
pub async fn request_otp(
    State(state): State<AppState>,
    AppJson(body): AppJson<OtpRequest>,
) -> Result<Json<OtpSentResponse>, AppError> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    let email = admit_email(&state, &body.email)?;

    state.otp_service().send(&email).await?;

    Ok(Json(OtpSentResponse {
        sent: true,
        expires_in_seconds: state.otp_service().ttl().num_seconds(),
    }))
}

/// POST /auth/verify
pub async fn verify_otp(
    State(state): State<AppState>,
    AppJson(body): AppJson<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, AppError> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    let email = admit_email(&state, &body.email)?;

    if !state.otp_service().verify(&email, body.otp.trim()).await? {
        return Err(AppError::Auth("Invalid or expired code".to_string()));
    }

    let response = match body.auth_type {
        AuthType::Login => VerifyOtpResponse::Authenticated(session_response(&state, &email)?),
        AuthType::Register | AuthType::Reset => VerifyOtpResponse::OtpVerified {
            setup_token: state.jwt_secret().issue_password_setup(&email)?,
        },
    };
    info!(auth_type = ?body.auth_type, "otp accepted");
    Ok(Json(response))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = admit_email(&state, &body.email)?;

    // A missing row and an unfinished registration answer alike.
    let user = state.store().user_find_by_email(&email).await?;
    let hash = match user {
        Some(UserRow {
            password_hash: Some(hash),
            is_registered: true,
            ..
        }) => hash,
        _ => return Err(AppError::Forbidden("Account is not registered".to_string())),
    };

    if !AuthAppService::verify_password(&body.password, &hash)? {
        return Err(AppError::Auth("Invalid email or password".to_string()));
    }

    Ok(Json(session_response(&state, &email)?))
}

/// POST /auth/set-password
pub async fn set_password(
    State(state): State<AppState>,
    SetupUser(claims): SetupUser,
    AppJson(body): AppJson<SetPasswordRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let issued_at = DateTime::<Utc>::from_timestamp(claims.iat, 0)
        .ok_or_else(|| AppError::Jwt("Invalid token issue time".to_string()))?;

    let password_hash = AuthAppService::hash_password(&body.password)?;
    // One password per setup token: a change after issue spends it.
    if !state
        .store()
        .user_set_password(&claims.sub, &password_hash, issued_at)
        .await?
    {
        return Err(AppError::Auth(
            "Setup token already used or account unknown".to_string(),
        ));
    }
    info!(email = %claims.sub, "password set");

    Ok(Json(session_response(&state, &claims.sub)?))
}

/// GET /auth/session
pub async fn session(AuthUser(claims): AuthUser) -> Json<UserInfo> {
    Json(claims.into())
}
