//! Jira Cloud REST client. Every call carries the service account's Basic credentials.

use axum::body::Bytes;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::JiraConfig;
use crate::error::{AppError, AppResult};
use crate::models::issue::{
    CommentPage, CreatedIssue, JiraComment, JiraIssue, JiraUser, Project, ProjectPage,
    SearchResults, Transition, TransitionList,
};

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const API: &str = "rest/api/3";
const GENERIC_UPSTREAM_MESSAGE: &str = "Jira request failed";

#[derive(Clone)]
pub struct JiraClient {
    http: Client,
    base_url: Url,
    email: String,
    api_token: String,
}

impl JiraClient {
    pub fn new(base_url: &str, email: &str, api_token: &str) -> AppResult<Self> {
        let mut base_url = Url::parse(base_url.trim())
            .map_err(|e| AppError::Config(format!("JIRA_URL: {}", e)))?;
        // Url::join drops the last path segment unless it ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder().user_agent(APP_USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url,
            email: email.to_string(),
            api_token: api_token.to_string(),
        })
    }

    pub fn from_config(config: &JiraConfig) -> AppResult<Self> {
        Self::new(&config.base_url, &config.email, &config.api_token)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("jira url {}: {}", path, e)))
    }

    fn request(&self, method: Method, path: &str) -> AppResult<RequestBuilder> {
        Ok(self
            .http
            .request(method, self.endpoint(path)?)
            .basic_auth(&self.email, Some(&self.api_token))
            .header(ACCEPT, "application/json"))
    }

    /// Send and turn any non-success status into [`AppError::Upstream`].
    async fn execute(&self, request: RequestBuilder) -> AppResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(%status, body = %body, "jira request failed");
        Err(upstream_error(status, &body))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = self.execute(request).await?;
        Ok(response.json::<T>().await?)
    }

    /// Enhanced JQL search (`/search/jql`). Pages are chained through `next_page_token`;
    /// the endpoint reports no total.
    #[instrument(skip(self, fields))]
    pub async fn search(
        &self,
        jql: &str,
        fields: &[&str],
        max_results: u32,
        page_token: Option<&str>,
    ) -> AppResult<SearchResults> {
        let mut query = vec![
            ("jql", jql.to_string()),
            ("fields", fields.join(",")),
            ("maxResults", max_results.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("nextPageToken", token.to_string()));
        }
        let request = self
            .request(Method::GET, &format!("{API}/search/jql"))?
            .query(&query);
        let results: SearchResults = self.fetch(request).await?;
        debug!(returned = results.issues.len(), is_last = ?results.is_last, "jira search");
        Ok(results)
    }

    #[instrument(skip(self, fields))]
    pub async fn get_issue(&self, key: &str, fields: &[&str]) -> AppResult<JiraIssue> {
        let request = self
            .request(Method::GET, &format!("{API}/issue/{key}"))?
            .query(&[("fields", fields.join(","))]);
        self.fetch(request).await
    }

    /// `fields` is the Jira `fields` object (project, summary, issuetype, ...).
    #[instrument(skip(self, fields))]
    pub async fn create_issue(&self, fields: Value) -> AppResult<CreatedIssue> {
        let request = self
            .request(Method::POST, &format!("{API}/issue"))?
            .json(&json!({ "fields": fields }));
        self.fetch(request).await
    }

    #[instrument(skip(self, body))]
    pub async fn update_issue(&self, key: &str, body: &Value) -> AppResult<()> {
        let request = self
            .request(Method::PUT, &format!("{API}/issue/{key}"))?
            .json(body);
        self.execute(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn comments(&self, key: &str) -> AppResult<Vec<JiraComment>> {
        let request = self.request(Method::GET, &format!("{API}/issue/{key}/comment"))?;
        let page: CommentPage = self.fetch(request).await?;
        Ok(page.comments)
    }

    /// `body` is an ADF document.
    #[instrument(skip(self, body))]
    pub async fn add_comment(&self, key: &str, body: Value) -> AppResult<JiraComment> {
        let request = self
            .request(Method::POST, &format!("{API}/issue/{key}/comment"))?
            .json(&json!({ "body": body }));
        self.fetch(request).await
    }

    #[instrument(skip(self))]
    pub async fn transitions(&self, key: &str) -> AppResult<Vec<Transition>> {
        let request = self.request(Method::GET, &format!("{API}/issue/{key}/transitions"))?;
        let list: TransitionList = self.fetch(request).await?;
        Ok(list.transitions)
    }

    #[instrument(skip(self))]
    pub async fn transition_issue(&self, key: &str, transition_id: &str) -> AppResult<()> {
        let request = self
            .request(Method::POST, &format!("{API}/issue/{key}/transitions"))?
            .json(&json!({ "transition": { "id": transition_id } }));
        self.execute(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn add_watcher(&self, key: &str, account_id: &str) -> AppResult<()> {
        let request = self
            .request(Method::POST, &format!("{API}/issue/{key}/watchers"))?
            .json(&account_id);
        self.execute(request).await?;
        Ok(())
    }

    /// Account id for `email`, preferring an exact address match over the first search hit.
    #[instrument(skip(self))]
    pub async fn find_account_id(&self, email: &str) -> AppResult<Option<String>> {
        let request = self
            .request(Method::GET, &format!("{API}/user/search"))?
            .query(&[("query", email)]);
        let users: Vec<JiraUser> = self.fetch(request).await?;
        let exact = users.iter().find(|u| {
            u.email_address
                .as_deref()
                .is_some_and(|addr| addr.eq_ignore_ascii_case(email))
        });
        Ok(exact.or(users.first()).and_then(|u| u.account_id.clone()))
    }

    #[instrument(skip(self))]
    pub async fn projects(&self) -> AppResult<Vec<Project>> {
        let request = self.request(Method::GET, &format!("{API}/project/search"))?;
        let page: ProjectPage = self.fetch(request).await?;
        Ok(page.values)
    }

    /// Raw pass-through for the proxy route. The upstream status is not checked.
    #[instrument(skip(self, body))]
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        body: Option<Bytes>,
    ) -> AppResult<Response> {
        let mut url = self.endpoint(path)?;
        url.set_query(query);
        let mut request = self
            .http
            .request(method, url)
            .basic_auth(&self.email, Some(&self.api_token))
            .header(ACCEPT, "application/json")
            .header("X-Atlassian-Token", "no-check");
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        Ok(request.send().await?)
    }
}

/// Map a Jira error response to [`AppError::Upstream`], keeping Jira's own messages as details.
pub fn upstream_error(status: StatusCode, body: &str) -> AppError {
    let mut details = Vec::new();
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(messages) = value.get("errorMessages").and_then(Value::as_array) {
            details.extend(messages.iter().filter_map(Value::as_str).map(str::to_string));
        }
        if let Some(errors) = value.get("errors").and_then(Value::as_object) {
            details.extend(
                errors
                    .iter()
                    .filter_map(|(field, msg)| msg.as_str().map(|m| format!("{}: {}", field, m))),
            );
        }
    }
    if details.is_empty() {
        if let Some(reason) = status.canonical_reason() {
            details.push(reason.to_string());
        }
    }
    AppError::Upstream {
        status,
        message: GENERIC_UPSTREAM_MESSAGE.to_string(),
        details,
    }
}
