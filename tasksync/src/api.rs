//! REST client for the task API.
//!
//! [`TaskApi`] is the seam the networking layer talks to. [`HttpTaskApi`]
//! implements it over `reqwest`, attaching the session's bearer token to
//! every request. The token is read at call time, so a login or logout
//! takes effect on the next request.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, StatusCode, header};
use serde::de::DeserializeOwned;
use tasksync_proto::task::{MessageBody, NewTask, ShareRequest, Task, TaskId, TaskPatch};
use tasksync_proto::user::UserProfile;

use crate::session::Session;

/// Session handle shared between the UI thread and network tasks.
pub type SharedSession = Arc<RwLock<Session>>;

/// Errors from API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No token is present; the user must sign in.
    #[error("not signed in")]
    Unauthenticated,

    /// The request could not be sent or the response not read.
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// `message` from the response body, when it had one.
        message: Option<String>,
    },

    /// A success response body was not the expected JSON.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl ApiError {
    /// Whether the error means the session is missing or rejected.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated | Self::Status { status: 401, .. }
        )
    }

    /// Message shown in the share modal for a failed share.
    ///
    /// The server's message is shown verbatim when present; other
    /// rejections show a generic failure, and transport problems show
    /// `"Server error"`.
    #[must_use]
    pub fn share_message(&self) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Status { message: None, .. } | Self::Unauthenticated => {
                "Failed to share task.".to_string()
            }
            Self::Transport(_) | Self::Decode(_) | Self::Client(_) => "Server error".to_string(),
        }
    }
}

/// Task and profile operations against the server.
pub trait TaskApi: Send + Sync {
    /// `GET /api/tasks`: every task visible to the signed-in user.
    fn list_tasks(&self) -> impl Future<Output = Result<Vec<Task>, ApiError>> + Send;

    /// `POST /api/tasks`: creates a task and returns the stored record.
    fn create_task(&self, task: &NewTask)
    -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `PUT /api/tasks/{id}`: applies `patch` and returns the stored record.
    fn update_task(
        &self,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `DELETE /api/tasks/{id}`.
    fn delete_task(&self, id: &TaskId) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `POST /api/tasks/{id}/share`: returns the server's message, if any.
    fn share_task(
        &self,
        id: &TaskId,
        request: &ShareRequest,
    ) -> impl Future<Output = Result<Option<String>, ApiError>> + Send;

    /// `GET /api/user/me`.
    fn fetch_profile(&self) -> impl Future<Output = Result<UserProfile, ApiError>> + Send;
}

/// [`TaskApi`] over HTTP.
pub struct HttpTaskApi {
    client: Client,
    base_url: String,
    session: SharedSession,
}

impl HttpTaskApi {
    /// Builds a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// [`ApiError::Client`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        session: SharedSession,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tasksync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            session,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let suffix = path.trim_start_matches('/');
        format!("{base}/{suffix}")
    }

    /// `Authorization` header value from the current session.
    fn bearer(&self) -> Result<String, ApiError> {
        self.session
            .read()
            .token()
            .map(|token| format!("Bearer {token}"))
            .ok_or(ApiError::Unauthenticated)
    }

    /// Sends `request` with auth and returns the body of a success response.
    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let bearer = self.bearer()?;
        let response = request
            .header(header::AUTHORIZATION, bearer)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if status.is_success() {
            return Ok(body);
        }
        tracing::debug!(%status, body = %truncate_for_error(&body), "API request rejected");
        Err(status_error(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::Decode(format!("{e}: {}", truncate_for_error(&body))))
    }
}

impl fmt::Debug for HttpTaskApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTaskApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TaskApi for HttpTaskApi {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.send_json(self.client.get(self.endpoint("api/tasks")))
            .await
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        self.send_json(self.client.post(self.endpoint("api/tasks")).json(task))
            .await
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        let url = self.endpoint(&format!("api/tasks/{id}"));
        self.send_json(self.client.put(url).json(patch)).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/tasks/{id}"));
        self.send(self.client.delete(url)).await.map(|_| ())
    }

    async fn share_task(
        &self,
        id: &TaskId,
        request: &ShareRequest,
    ) -> Result<Option<String>, ApiError> {
        let url = self.endpoint(&format!("api/tasks/{id}/share"));
        let body = self.send(self.client.post(url).json(request)).await?;
        Ok(serde_json::from_str::<MessageBody>(&body)
            .ok()
            .and_then(|b| b.message))
    }

    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.send_json(self.client.get(self.endpoint("api/user/me")))
            .await
    }
}

fn status_error(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<MessageBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty());
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

fn truncate_for_error(body: &str) -> String {
    const MAX_LEN: usize = 200;
    if body.chars().count() <= MAX_LEN {
        body.to_owned()
    } else {
        format!("{}...", body.chars().take(MAX_LEN).collect::<String>())
    }
}
