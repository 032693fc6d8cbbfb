//! JWT issue and validation.

use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const SESSION_TTL_DAYS: i64 = 30;
const PASSWORD_SETUP_TTL_MINUTES: i64 = 10;

/// Role carried by every portal session.
pub const DEFAULT_ROLE: &str = "user";

/// What a token may be used for. A setup token never opens a session and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Session,
    PasswordSetup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // email
    pub role: String,
    pub purpose: TokenPurpose,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone)]
pub struct JwtSecret {
    secret: String,
}

impl JwtSecret {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn issue_session(&self, email: &str) -> AppResult<String> {
        self.issue(
            email,
            TokenPurpose::Session,
            Duration::days(SESSION_TTL_DAYS),
        )
    }

    /// Short-lived token handed out after a register/reset code is verified.
    pub fn issue_password_setup(&self, email: &str) -> AppResult<String> {
        self.issue(
            email,
            TokenPurpose::PasswordSetup,
            Duration::minutes(PASSWORD_SETUP_TTL_MINUTES),
        )
    }

    fn issue(&self, email: &str, purpose: TokenPurpose, ttl: Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            role: DEFAULT_ROLE.to_string(),
            purpose,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Jwt(e.to_string()))?;
        Ok(token)
    }

    pub fn validate(&self, token: &str, purpose: TokenPurpose) -> AppResult<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| AppError::Jwt(e.to_string()))?;
        if data.claims.purpose != purpose {
            return Err(AppError::Jwt(
                "Token is not valid for this operation".to_string(),
            ));
        }
        Ok(data.claims)
    }
}
