//! Shared state and the health check.

use axum::{http::StatusCode, Json};
use serde_json::json;
use std::sync::Arc;

use crate::auth::{DomainPolicy, JwtSecret};
use crate::config::ProjectSettings;
use crate::db::AccountStore;
use crate::services::{JiraClient, OtpService};

/// Shared application state for every route.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AccountStore>,
    pub otp_service: OtpService,
    pub jira: JiraClient,
    pub project: ProjectSettings,
    pub domain_policy: DomainPolicy,
    pub jwt_secret: JwtSecret,
}

impl AppState {
    pub fn store(&self) -> &dyn AccountStore {
        self.store.as_ref()
    }
    pub fn jwt_secret(&self) -> &JwtSecret {
        &self.jwt_secret
    }
    pub fn jira(&self) -> &JiraClient {
        &self.jira
    }
    pub fn otp_service(&self) -> &OtpService {
        &self.otp_service
    }
}

/// GET /health — liveness check.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": env!("CARGO_PKG_NAME") })),
    )
}
