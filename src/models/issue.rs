//! Jira wire types (the subset the portal reads) and the shapes returned to the browser.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::models::adf;

const UNKNOWN_STATUS: &str = "Unknown";
const UNKNOWN_USER: &str = "Unknown User";

// ---- Wire types ----

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedField {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraUser {
    pub account_id: Option<String>,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraComment {
    pub id: String,
    #[serde(default)]
    pub body: Value,
    pub author: Option<JiraUser>,
    pub created: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPage {
    #[serde(default)]
    pub comments: Vec<JiraComment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFields {
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Value,
    pub status: Option<NamedField>,
    pub issuetype: Option<NamedField>,
    pub priority: Option<NamedField>,
    pub assignee: Option<JiraUser>,
    pub reporter: Option<JiraUser>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub comment: Option<CommentPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraIssue {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

/// One page of `/search/jql` results.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
    pub next_page_token: Option<String>,
    pub is_last: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
    #[serde(rename = "self")]
    pub self_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
    pub to: Option<NamedField>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionList {
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub key: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectPage {
    #[serde(default)]
    pub values: Vec<Project>,
}

impl JiraIssue {
    pub fn summary(&self) -> &str {
        self.fields.summary.as_deref().unwrap_or("")
    }

    pub fn status_name(&self) -> &str {
        self.fields
            .status
            .as_ref()
            .map(|s| s.name.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_STATUS)
    }

    pub fn description_text(&self) -> String {
        adf::plain_text(&self.fields.description)
    }

    /// Whether a public requester may see this ticket: reporter address match, or the
    /// whole address appears in the summary or description.
    pub fn belongs_to(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return false;
        }
        let reporter_matches = self
            .fields
            .reporter
            .as_ref()
            .and_then(|r| r.email_address.as_deref())
            .is_some_and(|addr| addr.eq_ignore_ascii_case(&email));
        reporter_matches
            || mentions_address(&self.summary().to_lowercase(), &email)
            || mentions_address(&self.description_text().to_lowercase(), &email)
    }

    fn comments(&self) -> Vec<CommentView> {
        self.fields
            .comment
            .as_ref()
            .map(|page| page.comments.iter().map(CommentView::from).collect())
            .unwrap_or_default()
    }
}

fn is_address_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-@".contains(c)
}

/// `email` occurs in `text` as a complete address. A longer address that merely
/// ends or starts with `email` does not count. Both arguments are lower-cased.
fn mentions_address(text: &str, email: &str) -> bool {
    text.match_indices(email).any(|(start, matched)| {
        let before = text[..start].chars().next_back();
        let mut after = text[start + matched.len()..].chars();
        let starts_clean = before.map_or(true, |c| !is_address_char(c));
        let ends_clean = match after.next() {
            None => true,
            // Sentence punctuation, unless the domain carries on past the dot.
            Some('.') => after.next().map_or(true, |c| !c.is_ascii_alphanumeric()),
            Some(c) => !is_address_char(c),
        };
        starts_clean && ends_clean
    })
}

// ---- Views returned to the browser ----

#[derive(Debug, Serialize)]
pub struct IssueSummary {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub status: String,
    pub assignee: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
}

impl From<JiraIssue> for IssueSummary {
    fn from(issue: JiraIssue) -> Self {
        Self {
            summary: issue.summary().to_string(),
            status: issue.status_name().to_string(),
            assignee: issue
                .fields
                .assignee
                .as_ref()
                .and_then(|a| a.display_name.clone()),
            created: issue.fields.created.clone(),
            updated: issue.fields.updated.clone(),
            id: issue.id,
            key: issue.key,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: String,
    pub body: String,
    pub author: String,
    pub created: Option<String>,
}

impl From<&JiraComment> for CommentView {
    fn from(comment: &JiraComment) -> Self {
        Self {
            id: comment.id.clone(),
            body: adf::plain_text(&comment.body),
            author: comment
                .author
                .as_ref()
                .and_then(|a| a.display_name.clone())
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            created: comment.created.clone(),
        }
    }
}

/// Full issue for signed-in users. `description_doc` keeps the raw ADF for rich rendering.
#[derive(Debug, Serialize)]
pub struct IssueDetail {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub status: String,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub description: String,
    pub description_doc: Value,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub comments: Vec<CommentView>,
}

impl From<JiraIssue> for IssueDetail {
    fn from(issue: JiraIssue) -> Self {
        let display = |user: &Option<JiraUser>| user.as_ref().and_then(|u| u.display_name.clone());
        Self {
            summary: issue.summary().to_string(),
            status: issue.status_name().to_string(),
            issue_type: issue.fields.issuetype.as_ref().map(|t| t.name.clone()),
            priority: issue.fields.priority.as_ref().map(|p| p.name.clone()),
            assignee: display(&issue.fields.assignee),
            reporter: display(&issue.fields.reporter),
            description: issue.description_text(),
            comments: issue.comments(),
            description_doc: issue.fields.description.clone(),
            created: issue.fields.created.clone(),
            updated: issue.fields.updated.clone(),
            id: issue.id,
            key: issue.key,
        }
    }
}

/// Ticket as shown on the public portal.
#[derive(Debug, Serialize)]
pub struct TicketView {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub description: String,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub comments: Vec<CommentView>,
}

impl From<JiraIssue> for TicketView {
    fn from(issue: JiraIssue) -> Self {
        Self {
            summary: issue.summary().to_string(),
            status: issue.status_name().to_string(),
            description: issue.description_text(),
            comments: issue.comments(),
            created: issue.fields.created.clone(),
            updated: issue.fields.updated.clone(),
            key: issue.key,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransitionView {
    pub id: String,
    pub name: String,
    pub to: Option<String>,
}

impl From<Transition> for TransitionView {
    fn from(t: Transition) -> Self {
        Self {
            id: t.id,
            name: t.name,
            to: t.to.map(|s| s.name),
        }
    }
}

// ---- Helpers ----

/// Reject anything that is not a plain issue key or id before it reaches a URL path.
pub fn validate_issue_key(key: &str) -> AppResult<()> {
    let ok = !key.is_empty()
        && key.len() <= 64
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !ok {
        return Err(AppError::Validation(format!("Invalid issue key: {}", key)));
    }
    Ok(())
}

/// Quote a value as a JQL string literal.
pub fn jql_quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}
