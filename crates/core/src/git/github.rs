//! GitHub REST API client (public events feed).

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::errors::GitHubError;
use crate::identity::EventFeed;
use crate::models::AuthorIdentity;

/// One entry of `GET /users/{login}/events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: GitHubEventPayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubEventPayload {
    /// Present on `PushEvent` only.
    #[serde(default)]
    pub commits: Vec<GitHubPushCommit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubPushCommit {
    pub sha: Option<String>,
    pub author: GitHubGitActor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubGitActor {
    pub name: String,
    pub email: String,
}

/// Author of the first commit of the first push event that has commits.
/// The feed is newest first, so this is the most recent push.
pub fn first_push_author(events: &[GitHubEvent]) -> Option<AuthorIdentity> {
    events
        .iter()
        .filter(|event| event.event_type == "PushEvent")
        .find_map(|event| event.payload.commits.first())
        .map(|commit| AuthorIdentity::new(&commit.author.name, &commit.author.email))
}

/// Asynchronous GitHub REST API client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Build a client. Without a token requests are anonymous and subject
    /// to the lower unauthenticated rate limit.
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Result<Self, GitHubError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("esolang-archive/0.1"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        info!(api_url = %api_url, authenticated = token.is_some(), "created GitHubClient");
        Ok(Self {
            http,
            api_url,
            token,
        })
    }

    /// Fetch the public event feed of `login`, newest first.
    #[instrument(skip(self))]
    pub async fn get_user_events(&self, login: &str) -> Result<Vec<GitHubEvent>, GitHubError> {
        let url = format!("{}/users/{}/events", self.api_url, login);
        let mut req = self.http.get(&url).query(&[("per_page", "100")]);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        self.check_response(&resp)?;
        let events: Vec<GitHubEvent> = resp.json().await?;
        debug!(count = events.len(), "fetched user events");
        Ok(events)
    }

    fn check_response(&self, resp: &reqwest::Response) -> Result<(), GitHubError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 401 {
            return Err(GitHubError::AuthenticationFailed(format!(
                "HTTP {}",
                status
            )));
        }
        let remaining = resp
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok());
        if status.as_u16() == 429 || (status.as_u16() == 403 && remaining == Some("0")) {
            let reset = resp
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();
            return Err(GitHubError::RateLimited { reset_at: reset });
        }
        if status.as_u16() == 403 {
            return Err(GitHubError::AuthenticationFailed(format!(
                "HTTP {}",
                status
            )));
        }
        Err(GitHubError::ApiError {
            status: status.as_u16(),
            body: format!("HTTP {}", status),
        })
    }
}

impl EventFeed for GitHubClient {
    async fn latest_push_author(&self, login: &str) -> Result<Option<AuthorIdentity>, GitHubError> {
        let events = self.get_user_events(login).await?;
        Ok(first_push_author(&events))
    }
}
