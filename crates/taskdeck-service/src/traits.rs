use async_trait::async_trait;
use bytes::Bytes;
use taskdeck_core::{CreateTaskRequest, Task, UpdateTaskRequest};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport-level failure: connect, TLS, body read.
    #[error("network error: {0}")]
    Network(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Supplies the current bearer token.
///
/// Token acquisition and refresh live outside this crate; callers only
/// need the token string at request time.
pub trait TokenProvider: Send + Sync {
    fn id_token(&self) -> String;
}

/// Fixed token handed in at startup (flag or environment).
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn id_token(&self) -> String {
        self.0.clone()
    }
}

/// Abstraction over the remote todo API.
///
/// The TUI programs against this trait. `HttpService` is the wire
/// implementation; tests drive it against the in-process stub server.
#[async_trait]
pub trait TodoService: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, ServiceError>;
    async fn create_task(&self, input: &CreateTaskRequest) -> Result<Task, ServiceError>;
    async fn update_task(&self, id: &str, update: &UpdateTaskRequest)
        -> Result<(), ServiceError>;
    async fn delete_task(&self, id: &str) -> Result<(), ServiceError>;

    /// Ask the API for a pre-signed upload target scoped to a task.
    /// The server associates the uploaded object with the task on its own.
    async fn attachment_upload_url(&self, id: &str) -> Result<String, ServiceError>;

    /// Raw transfer to a pre-signed URL. No auth header; the URL itself
    /// carries the grant.
    async fn upload_file(&self, upload_url: &str, data: Bytes) -> Result<(), ServiceError>;
}
