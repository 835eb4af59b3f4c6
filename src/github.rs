use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::GitHubConfig;

const API_BASE_URL: &str = "https://api.github.com";
const HTTP_TIMEOUT_SECS: u64 = 10;

pub const PUSH_EVENT: &str = "PushEvent";

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure or a non-success status from the API.
    #[error("GitHub events request failed: {message}")]
    TransportFailure {
        status: Option<u16>,
        message: String,
    },
    /// The API answered but the body was not the expected event list.
    #[error("GitHub events response could not be decoded: {message}")]
    ParseFailure { message: String },
}

// --- Event model ---

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    /// Number of commits in a push. Only push events carry it.
    #[serde(default)]
    pub size: Option<u64>,
}

impl Event {
    pub fn is_push(&self) -> bool {
        self.kind == PUSH_EVENT
    }

    pub fn push_size(&self) -> u64 {
        self.payload.size.unwrap_or(0)
    }
}

// --- Client ---

#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self) -> Result<Vec<Event>, FetchError>;
}

pub struct GitHubClient {
    client: Client,
    username: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("kusabot/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            username: config.username.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl EventSource for GitHubClient {
    /// Fetch the tracked account's recent public events.
    ///
    /// Only the first page is read; pushes that have already scrolled
    /// past it are not counted.
    async fn fetch_events(&self) -> Result<Vec<Event>, FetchError> {
        let url = format!("{API_BASE_URL}/users/{}/events", self.username);

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {token}"));
        }

        let response = request.send().await.map_err(|e| FetchError::TransportFailure {
            status: None,
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::TransportFailure {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let events: Vec<Event> = response.json().await.map_err(|e| FetchError::ParseFailure {
            message: e.to_string(),
        })?;

        tracing::debug!("Fetched {} events for {}", events.len(), self.username);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_events_fixture() {
        let body = r#"[
            {
                "id": "33500000001",
                "type": "PushEvent",
                "actor": {"id": 1, "login": "octocat"},
                "repo": {"id": 2, "name": "octocat/hello-world"},
                "payload": {"push_id": 99, "size": 3, "distinct_size": 3, "ref": "refs/heads/main"},
                "public": true,
                "created_at": "2024-01-15T23:30:00Z"
            },
            {
                "id": "33500000002",
                "type": "WatchEvent",
                "payload": {"action": "started"},
                "created_at": "2024-01-15T10:00:00Z"
            }
        ]"#;

        let events: Vec<Event> = serde_json::from_str(body).unwrap();
        assert_eq!(events.len(), 2);

        assert!(events[0].is_push());
        assert_eq!(events[0].push_size(), 3);

        assert!(!events[1].is_push());
        assert_eq!(events[1].push_size(), 0);
    }

    #[test]
    fn test_missing_payload_defaults_to_zero() {
        let body = r#"[{"type": "PushEvent", "created_at": "2024-01-15T23:30:00Z"}]"#;
        let events: Vec<Event> = serde_json::from_str(body).unwrap();
        assert!(events[0].is_push());
        assert_eq!(events[0].push_size(), 0);
    }
}
