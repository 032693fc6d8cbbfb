//! Public ticket portal. No login: requesters are identified by the email they supply,
//! and may only see or comment on tickets that belong to that email.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::AuthAppService;
use crate::error::{AppError, AppResult};
use crate::handlers::http::AppState;
use crate::middleware::{AppJson, AppQuery};
use crate::models::adf;
use crate::models::issue::{jql_quote, validate_issue_key, CommentView, JiraIssue, TicketView};

const TICKET_FIELDS: &[&str] = &[
    "summary",
    "description",
    "status",
    "reporter",
    "created",
    "updated",
    "comment",
];
const MAX_TICKETS: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct RequesterQuery {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicketRequest {
    #[validate(length(min = 1, max = 255))]
    pub summary: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TicketCommentRequest {
    #[validate(length(min = 1, max = 32767))]
    pub comment: String,
}

fn requester(query: RequesterQuery) -> AppResult<String> {
    let email = query
        .email
        .map(|e| AuthAppService::normalize_email(&e))
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::Validation("Email parameter is required".to_string()))?;
    AuthAppService::validate_email(&email)?;
    Ok(email)
}

/// Description stored in Jira: the requester's text plus a `Submitted by` line for ownership.
fn ticket_description(description: &str, email: &str) -> String {
    format!("{}\n\nSubmitted by: {}", description.trim_end(), email)
}

/// Tickets are created by the service account, so the reporter is not the requester.
/// Match on the address embedded in the text instead.
fn requester_jql(project_key: &str, email: &str) -> String {
    let text = format!("text ~ {}", jql_quote(email));
    if project_key.is_empty() {
        format!("{text} ORDER BY created DESC")
    } else {
        format!("project = {} AND {text} ORDER BY created DESC", jql_quote(project_key))
    }
}

async fn owned_ticket(state: &AppState, key: &str, email: &str, action: &str) -> AppResult<JiraIssue> {
    let issue = state.jira().get_issue(key, TICKET_FIELDS).await?;
    if !issue.belongs_to(email) {
        warn!(%key, %email, "requester does not own ticket");
        return Err(AppError::Forbidden(format!(
            "You do not have permission to {} this ticket",
            action
        )));
    }
    Ok(issue)
}

/// GET /api/public/tickets?email=
pub async fn list_tickets(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<RequesterQuery>,
) -> AppResult<Json<Vec<TicketView>>> {
    let email = requester(query)?;
    let jql = requester_jql(&state.project.project_key, &email);

    let results = state
        .jira()
        .search(&jql, TICKET_FIELDS, MAX_TICKETS, None)
        .await?;
    let tickets = results
        .issues
        .into_iter()
        .filter(|issue| issue.belongs_to(&email))
        .map(TicketView::from)
        .collect();
    Ok(Json(tickets))
}

/// POST /api/public/tickets
pub async fn create_ticket(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateTicketRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let email = AuthAppService::normalize_email(&body.email);
    let project_key = &state.project.project_key;
    if project_key.is_empty() {
        return Err(AppError::Config("JIRA_PROJECT_KEY is not set".to_string()));
    }

    let fields = json!({
        "project": { "key": project_key },
        "summary": body.summary.trim(),
        "description": adf::text_doc(&ticket_description(&body.description, &email)),
        "issuetype": { "name": state.project.public_issue_type },
    });
    let created = state.jira().create_issue(fields).await?;
    info!(key = %created.key, %email, "public ticket created");

    add_requester_as_watcher(&state, &created.key, &email).await;

    Ok((StatusCode::CREATED, Json(json!({ "key": created.key }))))
}

/// Best effort: the ticket already exists, so failures are only logged.
async fn add_requester_as_watcher(state: &AppState, key: &str, email: &str) {
    let account_id = match state.jira().find_account_id(email).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            info!(%key, %email, "requester has no jira account; watcher skipped");
            return;
        }
        Err(e) => {
            warn!(%key, error = %e, "watcher lookup failed");
            return;
        }
    };
    if let Err(e) = state.jira().add_watcher(key, &account_id).await {
        warn!(%key, error = %e, "failed to add watcher");
    }
}

/// GET /api/public/tickets/:key?email=
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(key): Path<String>,
    AppQuery(query): AppQuery<RequesterQuery>,
) -> AppResult<Json<TicketView>> {
    validate_issue_key(&key)?;
    let email = requester(query)?;
    let issue = owned_ticket(&state, &key, &email, "view").await?;
    Ok(Json(issue.into()))
}

/// POST /api/public/tickets/:key/comments?email=
pub async fn add_ticket_comment(
    State(state): State<AppState>,
    Path(key): Path<String>,
    AppQuery(query): AppQuery<RequesterQuery>,
    AppJson(body): AppJson<TicketCommentRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    validate_issue_key(&key)?;
    let email = requester(query)?;
    body.validate()
        .map_err(|_| AppError::Validation("Comment text is required".to_string()))?;
    if body.comment.trim().is_empty() {
        return Err(AppError::Validation("Comment text is required".to_string()));
    }
    owned_ticket(&state, &key, &email, "comment on").await?;

    let comment = state
        .jira()
        .add_comment(&key, adf::on_behalf_comment(body.comment.trim()))
        .await?;
    let view = CommentView::from(&comment);
    info!(%key, %email, comment_id = %view.id, "public comment added");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "comment_id": view.id,
            "created": view.created,
            "author": view.author,
        })),
    ))
}
