//! Web backend that fronts a Jira Cloud site.
//!
//! Signed-in users (one-time email codes or passwords) browse, create, comment on and
//! transition issues. A public portal lets anyone file and follow tickets by email, and an
//! authenticated proxy forwards raw REST calls with the service account's credentials.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::AppError;
pub use handlers::http::AppState;

use axum::http::{header, HeaderName, Method};
use axum::routing::{any, get, post};
use handlers::{http, issues, proxy, public};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-atlassian-token"),
        ])
        .max_age(CORS_MAX_AGE)
}

/// Build the router (health, auth, issues, public portal, proxy). Used by main and by integration tests.
pub fn create_app(state: AppState) -> axum::Router {
    let auth_routes = axum::Router::new()
        .route("/otp", post(auth::request_otp))
        .route("/verify", post(auth::verify_otp))
        .route("/login", post(auth::login))
        .route("/set-password", post(auth::set_password))
        .route("/session", get(auth::session));

    let api_routes = axum::Router::new()
        .route("/projects", get(issues::list_projects))
        .route("/issues", get(issues::list_issues).post(issues::create_issue))
        .route(
            "/issues/:key",
            get(issues::get_issue).put(issues::update_issue),
        )
        .route(
            "/issues/:key/comments",
            get(issues::list_comments).post(issues::add_comment),
        )
        .route(
            "/issues/:key/transitions",
            get(issues::list_transitions).post(issues::apply_transition),
        )
        .route(
            "/public/tickets",
            get(public::list_tickets).post(public::create_ticket),
        )
        .route("/public/tickets/:key", get(public::get_ticket))
        .route(
            "/public/tickets/:key/comments",
            post(public::add_ticket_comment),
        )
        .route("/proxy/*path", any(proxy::proxy));

    axum::Router::new()
        .route("/health", get(http::health))
        .nest("/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors()),
        )
        .with_state(state)
}
