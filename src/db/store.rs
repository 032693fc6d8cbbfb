//! Account store seam: PostgreSQL in production, process-local maps for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repositories::{self, UserRow};
use super::DbPool;
use crate::error::AppResult;

/// Users and one-time codes, keyed by lower-cased email.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn user_find_by_email(&self, email: &str) -> AppResult<Option<UserRow>>;

    /// Create an unregistered user if none exists; existing rows are left alone.
    async fn user_ensure(&self, email: &str) -> AppResult<()>;

    /// Returns false when the user does not exist, or its password was already set at or
    /// after `not_before`.
    async fn user_set_password(
        &self,
        email: &str,
        password_hash: &str,
        not_before: DateTime<Utc>,
    ) -> AppResult<bool>;

    async fn otp_insert(&self, email: &str, code: &str, expires_at: DateTime<Utc>)
        -> AppResult<()>;

    /// Remove every code for the email; returns how many were dropped.
    async fn otp_revoke(&self, email: &str) -> AppResult<u64>;

    /// True if a live code matched; all codes for the email are then gone.
    async fn otp_consume(&self, email: &str, code: &str, now: DateTime<Utc>) -> AppResult<bool>;

    async fn otp_delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

// ---- PostgreSQL ----

#[derive(Clone)]
pub struct PgAccountStore {
    pool: DbPool,
}

impl PgAccountStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn user_find_by_email(&self, email: &str) -> AppResult<Option<UserRow>> {
        repositories::user_find_by_email(&self.pool, email).await
    }

    async fn user_ensure(&self, email: &str) -> AppResult<()> {
        repositories::user_ensure(&self.pool, email).await
    }

    async fn user_set_password(
        &self,
        email: &str,
        password_hash: &str,
        not_before: DateTime<Utc>,
    ) -> AppResult<bool> {
        repositories::user_set_password(&self.pool, email, password_hash, not_before).await
    }

    async fn otp_insert(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        repositories::otp_insert(&self.pool, email, code, expires_at).await
    }

    async fn otp_revoke(&self, email: &str) -> AppResult<u64> {
        repositories::otp_revoke(&self.pool, email).await
    }

    async fn otp_consume(&self, email: &str, code: &str, now: DateTime<Utc>) -> AppResult<bool> {
        repositories::otp_consume(&self.pool, email, code, now).await
    }

    async fn otp_delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        repositories::otp_delete_expired(&self.pool, now).await
    }
}

// ---- In-memory ----

#[derive(Debug, Clone)]
struct OtpRecord {
    email: String,
    code: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, UserRow>,
    otps: Vec<OtpRecord>,
}

/// Non-persistent store. Everything is lost on restart.
#[derive(Default)]
pub struct MemoryAccountStore {
    state: RwLock<MemoryState>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn user_find_by_email(&self, email: &str) -> AppResult<Option<UserRow>> {
        Ok(self.state.read().await.users.get(email).cloned())
    }

    async fn user_ensure(&self, email: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.users.entry(email.to_string()).or_insert_with(|| {
            let now = Utc::now();
            UserRow {
                id: Uuid::new_v4(),
                email: email.to_string(),
                password_hash: None,
                is_registered: false,
                email_verified_at: Some(now),
                password_updated_at: None,
                created_at: now,
            }
        });
        Ok(())
    }

    async fn user_set_password(
        &self,
        email: &str,
        password_hash: &str,
        not_before: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut state = self.state.write().await;
        match state.users.get_mut(email) {
            Some(user) if user.password_updated_at.map_or(true, |t| t < not_before) => {
                user.password_hash = Some(password_hash.to_string());
                user.is_registered = true;
                user.password_updated_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn otp_insert(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.state.write().await.otps.push(OtpRecord {
            email: email.to_string(),
            code: code.to_string(),
            expires_at,
        });
        Ok(())
    }

    async fn otp_revoke(&self, email: &str) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let before = state.otps.len();
        state.otps.retain(|o| o.email != email);
        Ok((before - state.otps.len()) as u64)
    }

    async fn otp_consume(&self, email: &str, code: &str, now: DateTime<Utc>) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let hit = state
            .otps
            .iter()
            .any(|o| o.email == email && o.code == code && o.expires_at >= now);
        if hit {
            state.otps.retain(|o| o.email != email);
        }
        Ok(hit)
    }

    async fn otp_delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let before = state.otps.len();
        state.otps.retain(|o| o.expires_at >= now);
        Ok((before - state.otps.len()) as u64)
    }
}
