//! Repositories: users and one-time codes.

use crate::error::AppResult;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;

// ---- User ----

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub is_registered: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub password_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub async fn user_find_by_email(pool: &DbPool, email: &str) -> AppResult<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, email, password_hash, is_registered, email_verified_at, password_updated_at, created_at
        FROM users WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Insert a bare, unregistered user unless one already exists.
pub async fn user_ensure(pool: &DbPool, email: &str) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users (email, email_verified_at)
        VALUES ($1, NOW())
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(email)
    .execute(pool)
    .await?;
    Ok(())
}

/// Store a password hash and mark the account registered, unless the password was already
/// set at or after `not_before`. Returns false if no row was updated.
pub async fn user_set_password(
    pool: &DbPool,
    email: &str,
    password_hash: &str,
    not_before: DateTime<Utc>,
) -> AppResult<bool> {
    let r = sqlx::query(
        r#"
        UPDATE users
        SET password_hash = $2, is_registered = true, password_updated_at = NOW()
        WHERE email = $1
          AND (password_updated_at IS NULL OR password_updated_at < $3)
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .bind(not_before)
    .execute(pool)
    .await?;
    Ok(r.rows_affected() > 0)
}

// ---- OTP codes ----

pub async fn otp_insert(
    pool: &DbPool,
    email: &str,
    code: &str,
    expires_at: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query("INSERT INTO otp_codes (email, code, expires_at) VALUES ($1, $2, $3)")
        .bind(email)
        .bind(code)
        .bind(expires_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Drop every outstanding code for `email`, live or not.
pub async fn otp_revoke(pool: &DbPool, email: &str) -> AppResult<u64> {
    let r = sqlx::query("DELETE FROM otp_codes WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await?;
    Ok(r.rows_affected())
}

/// Delete every code for `email` if one of them matches and is still live.
/// Concurrent verifications of the same code: at most one sees rows affected.
pub async fn otp_consume(
    pool: &DbPool,
    email: &str,
    code: &str,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let r = sqlx::query(
        r#"
        DELETE FROM otp_codes
        WHERE email = $1
          AND EXISTS (
            SELECT 1 FROM otp_codes
            WHERE email = $1 AND code = $2 AND expires_at >= $3
          )
        "#,
    )
    .bind(email)
    .bind(code)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(r.rows_affected() > 0)
}

pub async fn otp_delete_expired(pool: &DbPool, now: DateTime<Utc>) -> AppResult<u64> {
    let r = sqlx::query("DELETE FROM otp_codes WHERE expires_at < $1")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(r.rows_affected())
}
