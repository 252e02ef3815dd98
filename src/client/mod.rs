//! Client side of the task API.
//!
//! [`ApiClient`] speaks HTTP to a running service; [`TaskListView`] keeps a
//! local copy of the task list and reconciles it from each response.

mod view;

pub use view::{AlwaysConfirm, Confirm, LoadState, TaskListView, ViewError};

use crate::types::Task;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors from a single API round trip.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error! status: {status}: {message}")]
    Status { status: StatusCode, message: String },
}

impl ClientError {
    /// HTTP status of a rejected request, if the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http(e) => e.status(),
            ClientError::Status { status, .. } => Some(*status),
        }
    }
}

/// The four task operations, as seen by a client.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Task>, ClientError>;
    async fn create(&self, title: &str) -> Result<Task, ClientError>;
    async fn set_completed(&self, id: i64, completed: bool) -> Result<Task, ClientError>;
    async fn delete(&self, id: i64) -> Result<(), ClientError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the task API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is the API root, e.g. `http://localhost:5002/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-success response into [`ClientError::Status`], keeping the
    /// server's `{error}` message when there is one.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        Err(ClientError::Status { status, message })
    }
}

#[async_trait]
impl TaskApi for ApiClient {
    async fn list(&self) -> Result<Vec<Task>, ClientError> {
        let response = self.http.get(self.url("/tasks")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn create(&self, title: &str) -> Result<Task, ClientError> {
        let response = self
            .http
            .post(self.url("/tasks"))
            .json(&json!({ "title": title }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn set_completed(&self, id: i64, completed: bool) -> Result<Task, ClientError> {
        let response = self
            .http
            .put(self.url(&format!("/tasks/{}", id)))
            .json(&json!({ "completed": completed }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete(&self, id: i64) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/tasks/{}", id)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = ApiClient::new("http://localhost:5002/api/");
        assert_eq!(client.base_url(), "http://localhost:5002/api");
        assert_eq!(client.url("/tasks/3"), "http://localhost:5002/api/tasks/3");
    }

    #[test]
    fn status_error_reports_status() {
        let err = ClientError::Status {
            status: StatusCode::NOT_FOUND,
            message: "Task not found".to_string(),
        };
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "HTTP error! status: 404 Not Found: Task not found");
    }
}
