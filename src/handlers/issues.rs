//! Issue endpoints for signed-in users. Every call runs as the Jira service account.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::http::AppState;
use crate::middleware::{AppJson, AppQuery, AuthUser};
use crate::models::adf;
use crate::models::issue::{
    validate_issue_key, CommentView, IssueDetail, IssueSummary, Project, TransitionView,
};

const LIST_FIELDS: &[&str] = &["summary", "status", "assignee", "created", "updated"];
const DETAIL_FIELDS: &[&str] = &[
    "summary",
    "description",
    "status",
    "issuetype",
    "priority",
    "assignee",
    "reporter",
    "created",
    "updated",
    "comment",
];
const DEFAULT_MAX_RESULTS: u32 = 50;
const MAX_RESULTS_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct IssueListQuery {
    pub jql: Option<String>,
    pub max_results: Option<u32>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateIssueRequest {
    #[validate(length(min = 1, max = 255))]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    /// Jira account id.
    pub assignee: Option<String>,
    pub project_key: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 32767))]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub transition_id: String,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Jira `fields` object for a new issue.
fn create_fields(body: &CreateIssueRequest, project_key: &str) -> Value {
    let mut fields = Map::new();
    fields.insert("project".into(), json!({ "key": project_key }));
    fields.insert("summary".into(), json!(body.summary.trim()));
    fields.insert("description".into(), adf::text_doc(&body.description));
    fields.insert(
        "issuetype".into(),
        json!({ "name": non_blank(body.issue_type.as_ref()).unwrap_or("Task") }),
    );
    if let Some(priority) = non_blank(body.priority.as_ref()) {
        fields.insert("priority".into(), json!({ "name": priority }));
    }
    if let Some(assignee) = non_blank(body.assignee.as_ref()) {
        fields.insert("assignee".into(), json!({ "id": assignee }));
    }
    Value::Object(fields)
}

/// GET /api/issues
pub async fn list_issues(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    AppQuery(query): AppQuery<IssueListQuery>,
) -> AppResult<Json<Value>> {
    let jql = non_blank(query.jql.as_ref())
        .map(str::to_string)
        .unwrap_or_else(|| state.project.default_jql());
    let max_results = query
        .max_results
        .unwrap_or(DEFAULT_MAX_RESULTS)
        .clamp(1, MAX_RESULTS_LIMIT);

    let page_token = non_blank(query.next_page_token.as_ref());

    let results = state
        .jira()
        .search(&jql, LIST_FIELDS, max_results, page_token)
        .await?;
    let is_last = results
        .is_last
        .unwrap_or(results.next_page_token.is_none());
    let issues: Vec<IssueSummary> = results.issues.into_iter().map(Into::into).collect();
    Ok(Json(json!({
        "issues": issues,
        "next_page_token": results.next_page_token,
        "is_last": is_last,
    })))
}

/// POST /api/issues
pub async fn create_issue(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    AppJson(body): AppJson<CreateIssueRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    if body.summary.trim().is_empty() {
        return Err(AppError::Validation("Summary is required".to_string()));
    }
    let project_key = non_blank(body.project_key.as_ref())
        .unwrap_or(state.project.project_key.as_str())
        .to_string();
    if project_key.is_empty() {
        return Err(AppError::Validation("project_key is required".to_string()));
    }

    let created = state
        .jira()
        .create_issue(create_fields(&body, &project_key))
        .await?;
    info!(key = %created.key, by = %claims.sub, "issue created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": created })),
    ))
}

/// GET /api/issues/:key
pub async fn get_issue(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(key): Path<String>,
) -> AppResult<Json<IssueDetail>> {
    validate_issue_key(&key)?;
    let issue = state.jira().get_issue(&key, DETAIL_FIELDS).await?;
    Ok(Json(issue.into()))
}

/// PUT /api/issues/:key — body goes to Jira as-is.
pub async fn update_issue(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(key): Path<String>,
    AppJson(body): AppJson<Value>,
) -> AppResult<Json<Value>> {
    validate_issue_key(&key)?;
    let has_changes = body
        .as_object()
        .is_some_and(|o| o.contains_key("fields") || o.contains_key("update"));
    if !has_changes {
        return Err(AppError::Validation(
            "Request body must contain `fields` or `update`".to_string(),
        ));
    }
    state.jira().update_issue(&key, &body).await?;
    info!(%key, by = %claims.sub, "issue updated");
    Ok(Json(json!({ "success": true, "key": key })))
}

/// GET /api/issues/:key/comments
pub async fn list_comments(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(key): Path<String>,
) -> AppResult<Json<Vec<CommentView>>> {
    validate_issue_key(&key)?;
    let comments = state.jira().comments(&key).await?;
    Ok(Json(comments.iter().map(CommentView::from).collect()))
}

/// POST /api/issues/:key/comments
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(key): Path<String>,
    AppJson(body): AppJson<CommentRequest>,
) -> AppResult<(StatusCode, Json<CommentView>)> {
    validate_issue_key(&key)?;
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let comment = state
        .jira()
        .add_comment(&key, adf::on_behalf_comment(body.comment.trim()))
        .await?;
    info!(%key, by = %claims.sub, "comment added");
    Ok((StatusCode::CREATED, Json(CommentView::from(&comment))))
}

/// GET /api/issues/:key/transitions
pub async fn list_transitions(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(key): Path<String>,
) -> AppResult<Json<Vec<TransitionView>>> {
    validate_issue_key(&key)?;
    let transitions = state.jira().transitions(&key).await?;
    Ok(Json(transitions.into_iter().map(Into::into).collect()))
}

/// POST /api/issues/:key/transitions — only transitions Jira currently offers are applied.
pub async fn apply_transition(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(key): Path<String>,
    AppJson(body): AppJson<TransitionRequest>,
) -> AppResult<Json<Value>> {
    validate_issue_key(&key)?;
    let transition_id = body.transition_id.trim();

    let available = state.jira().transitions(&key).await?;
    let Some(transition) = available.into_iter().find(|t| t.id == transition_id) else {
        return Err(AppError::Validation("Invalid transition ID".to_string()));
    };

    state.jira().transition_issue(&key, &transition.id).await?;
    info!(%key, transition = %transition.name, by = %claims.sub, "issue transitioned");
    Ok(Json(json!({
        "success": true,
        "key": key,
        "transition": TransitionView::from(transition),
    })))
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> AppResult<Json<Vec<Project>>> {
    Ok(Json(state.jira().projects().await?))
}
