#![forbid(unsafe_code)]

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::api::types::{ChatReply, ChatRequest, DeleteAck, NewTask, Task, TaskPatch};
use crate::error::ApiError;
use crate::session::Session;

/// Sole path from the UI to remote task/chat state. Every request carries
/// the session's bearer token when one exists; when it does not, the request
/// goes out unauthenticated and the backend decides.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
    token: Option<String>,
}

impl ApiClient {
    /// No client-side timeout: a hung request blocks only the action that
    /// issued it, never the process.
    #[must_use]
    pub fn new(base_url: &str, session: &Session) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            user_id: session.user_id.clone(),
            token: session.token.clone(),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn tasks_url(&self) -> String {
        format!(
            "{}/api/{}/tasks",
            self.base_url,
            urlencoding::encode(&self.user_id)
        )
    }

    fn task_url(&self, task_id: i64) -> String {
        format!("{}/{task_id}", self.tasks_url())
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut req = self.http.request(method, url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "request rejected");
            return Err(ApiError::from_response(status.as_u16(), body));
        }
        deserialize_body(status, response.text().await?)
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        tracing::debug!(user = %self.user_id, "listing tasks");
        self.execute(self.request(Method::GET, &self.tasks_url()))
            .await
    }

    /// Title must be non-empty; rejected before any request goes out.
    pub async fn create_task(&self, body: &NewTask) -> Result<Task, ApiError> {
        if body.title.trim().is_empty() {
            return Err(ApiError::validation("title is required"));
        }
        tracing::debug!(title = %body.title, "creating task");
        self.execute(self.request(Method::POST, &self.tasks_url()).json(body))
            .await
    }

    pub async fn update_task(&self, task_id: i64, patch: &TaskPatch) -> Result<Task, ApiError> {
        tracing::debug!(task_id, "updating task");
        self.execute(
            self.request(Method::PUT, &self.task_url(task_id))
                .json(patch),
        )
        .await
    }

    /// Not idempotent: deleting an id the server does not hold fails.
    pub async fn delete_task(&self, task_id: i64) -> Result<DeleteAck, ApiError> {
        tracing::debug!(task_id, "deleting task");
        self.execute(self.request(Method::DELETE, &self.task_url(task_id)))
            .await
    }

    /// Flips `completed`. When the result is a completed recurring task the
    /// server has already spawned the successor; the caller must re-list to
    /// see it.
    pub async fn toggle_complete(&self, task_id: i64) -> Result<Task, ApiError> {
        tracing::debug!(task_id, "toggling completion");
        let url = format!("{}/complete", self.task_url(task_id));
        self.execute(self.request(Method::PATCH, &url)).await
    }

    /// `conversation` None starts a new conversation; the reply carries the
    /// id to echo on subsequent sends.
    pub async fn send_chat(
        &self,
        message: &str,
        conversation: Option<i64>,
    ) -> Result<ChatReply, ApiError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ApiError::validation("message is required"));
        }
        tracing::debug!(conversation, "sending chat message");
        let url = format!(
            "{}/api/{}/chat",
            self.base_url,
            urlencoding::encode(&self.user_id)
        );
        let body = ChatRequest {
            message: message.to_owned(),
            conversation_id: conversation,
        };
        self.execute(self.request(Method::POST, &url).json(&body))
            .await
    }
}

fn deserialize_body<T: DeserializeOwned>(status: StatusCode, body: String) -> Result<T, ApiError> {
    serde_json::from_str(&body).map_err(|e| ApiError {
        kind: crate::error::ApiErrorKind::Unknown,
        status: Some(status.as_u16()),
        message: format!("failed to parse response body: {e}"),
    })
}
