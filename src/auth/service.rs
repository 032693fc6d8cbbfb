//! Auth application service: password hashing, email checks, approved domains.

use crate::error::{AppError, AppResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::ValidateEmail;

pub struct AuthAppService;

impl AuthAppService {
    pub fn hash_password(password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("hash: {}", e)))?
            .to_string();
        Ok(hash)
    }

    pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
        let parsed =
            PasswordHash::new(hash).map_err(|e| AppError::Internal(anyhow::anyhow!("parse hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Accounts are keyed by the trimmed, lower-cased address.
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    pub fn validate_email(email: &str) -> AppResult<()> {
        if !email.validate_email() {
            return Err(AppError::Validation("Invalid email".to_string()));
        }
        Ok(())
    }
}

/// Email domains allowed to sign in. An empty list admits everyone.
#[derive(Debug, Clone, Default)]
pub struct DomainPolicy {
    approved: Vec<String>,
}

impl DomainPolicy {
    pub fn new(domains: Vec<String>) -> Self {
        let approved = domains
            .into_iter()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { approved }
    }

    pub fn is_approved(&self, email: &str) -> bool {
        if self.approved.is_empty() {
            return true;
        }
        match email.rsplit_once('@') {
            Some((_, domain)) => self
                .approved
                .iter()
                .any(|d| d.eq_ignore_ascii_case(domain)),
            None => false,
        }
    }

    pub fn check(&self, email: &str) -> AppResult<()> {
        if !self.is_approved(email) {
            return Err(AppError::Forbidden(
                "Your email domain is not authorized".to_string(),
            ));
        }
        Ok(())
    }
}
