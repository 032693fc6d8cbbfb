//! Entry point: load config, wire dependencies, and run the server.

use chrono::Duration;
use jiradesk::auth::{DomainPolicy, JwtSecret};
use jiradesk::config::{Config, MailerKind, StoreKind};
use jiradesk::db::{self, AccountStore, MemoryAccountStore, PgAccountStore};
use jiradesk::services::{JiraClient, LogMailer, Mailer, OtpService, SendGridMailer};
use jiradesk::{create_app, AppState};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Arc<dyn AccountStore> = match config.store {
        StoreKind::Postgres => {
            let pool = db::create_pool(&config.database_url).await?;
            db::run_migrations(&pool).await?;
            Arc::new(PgAccountStore::new(pool))
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory account store; accounts are lost on restart");
            Arc::new(MemoryAccountStore::new())
        }
    };

    let mailer: Arc<dyn Mailer> = match config.mail.kind {
        MailerKind::SendGrid => Arc::new(SendGridMailer::new(&config.mail)?),
        MailerKind::Log => {
            tracing::warn!("mail delivery disabled; verification codes go to the log");
            Arc::new(LogMailer)
        }
    };

    let otp_service = OtpService::new(
        store.clone(),
        mailer,
        Duration::minutes(config.otp_ttl_minutes),
    );
    otp_service.clone().spawn_sweeper(std::time::Duration::from_secs(
        config.otp_sweep_interval_secs,
    ));

    let jira = JiraClient::from_config(&config.jira)?;
    tracing::info!(jira = %jira.base_url(), project = %config.jira.project.project_key, "jira configured");

    let state = AppState {
        store,
        otp_service,
        jira,
        project: config.jira.project.clone(),
        domain_policy: DomainPolicy::new(config.approved_domains.clone()),
        jwt_secret: JwtSecret::new(config.jwt_secret.clone()),
    };

    let mut app = create_app(state);
    if let Some(dir) = &config.static_dir {
        tracing::info!(dir = %dir.display(), "serving static front-end");
        app = app.fallback_service(ServeDir::new(dir));
    }

    tracing::info!(addr = %config.server_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
