//! One-time codes: issue, mail, verify, and sweep.

use chrono::{Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::db::AccountStore;
use crate::error::AppResult;
use crate::services::mailer::{otp_email, Mailer};

pub const OTP_LENGTH: usize = 6;

#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn AccountStore>,
    mailer: Arc<dyn Mailer>,
    ttl: Duration,
}

impl OtpService {
    pub fn new(store: Arc<dyn AccountStore>, mailer: Arc<dyn Mailer>, ttl: Duration) -> Self {
        Self { store, mailer, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Uniform 6-digit code, never with a leading zero.
    pub fn generate_code() -> String {
        rand::thread_rng().gen_range(100_000..1_000_000).to_string()
    }

    pub fn is_well_formed(code: &str) -> bool {
        code.len() == OTP_LENGTH && code.chars().all(|c| c.is_ascii_digit())
    }

    /// Store a fresh code for `email` and mail it, replacing any earlier code.
    /// The user row is created if missing.
    #[instrument(skip(self))]
    pub async fn send(&self, email: &str) -> AppResult<()> {
        self.sweep_quietly().await;

        let is_registered = self
            .store
            .user_find_by_email(email)
            .await?
            .is_some_and(|u| u.is_registered);
        self.store.user_ensure(email).await?;

        let code = Self::generate_code();
        let expires_at = Utc::now() + self.ttl;
        let revoked = self.store.otp_revoke(email).await?;
        if revoked > 0 {
            debug!(revoked, "earlier codes dropped");
        }
        self.store.otp_insert(email, &code, expires_at).await?;

        let message = otp_email(email, &code, is_registered, self.ttl.num_minutes());
        self.mailer.send(&message).await?;
        info!(is_registered, "otp sent");
        Ok(())
    }

    /// True when `code` is live for `email`. A verified code cannot be used again.
    #[instrument(skip(self, code))]
    pub async fn verify(&self, email: &str, code: &str) -> AppResult<bool> {
        if !Self::is_well_formed(code) {
            return Ok(false);
        }
        self.sweep_quietly().await;
        let ok = self.store.otp_consume(email, code, Utc::now()).await?;
        if ok {
            info!("otp verified");
        } else {
            debug!("no live otp matched");
        }
        Ok(ok)
    }

    pub async fn sweep(&self) -> AppResult<u64> {
        self.store.otp_delete_expired(Utc::now()).await
    }

    async fn sweep_quietly(&self) {
        if let Err(e) = self.sweep().await {
            warn!(error = %e, "expired otp cleanup failed");
        }
    }

    /// Periodically delete expired codes until the runtime shuts down.
    pub fn spawn_sweeper(self, every: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match self.sweep().await {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed, "expired otp codes swept"),
                    Err(e) => warn!(error = %e, "expired otp sweep failed"),
                }
            }
        })
    }
}
