use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use taskdeck_core::{CreateTaskRequest, Task, UpdateTaskRequest};
use tracing::debug;

use crate::{ServiceError, TodoService, TokenProvider};

#[derive(Deserialize)]
struct ItemsEnvelope {
    items: Vec<Task>,
}

#[derive(Deserialize)]
struct ItemEnvelope {
    item: Task,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadUrlEnvelope {
    upload_url: String,
}

/// Async HTTP implementation of `TodoService`.
/// Talks to the remote todo API with a bearer token per request.
pub struct HttpService {
    base_url: String,
    client: Client,
    token: Arc<dyn TokenProvider>,
}

impl HttpService {
    pub fn new(base_url: &str, token: Arc<dyn TokenProvider>) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            client: Client::new(),
            token,
        }
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", self.token.id_token()))
            .header("Content-Type", "application/json")
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let builder = self.client.get(format!("{}{path}", self.base_url));
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        handle_response(resp).await
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let builder = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body);
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        handle_response(resp).await
    }

    /// POST with an empty body, for endpoints that take no input.
    async fn post_empty<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let builder = self.client.post(format!("{}{path}", self.base_url));
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        handle_response(resp).await
    }

    async fn patch_json<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<(), ServiceError> {
        let builder = self
            .client
            .patch(format!("{}{path}", self.base_url))
            .json(body);
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(parse_error(resp).await)
        }
    }

    async fn delete_req(&self, path: &str) -> Result<(), ServiceError> {
        let builder = self.client.delete(format!("{}{path}", self.base_url));
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(parse_error(resp).await)
        }
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        resp.json::<T>()
            .await
            .map_err(|e| ServiceError::Internal(format!("json decode: {e}")))
    } else {
        Err(parse_error_with_status(status, resp).await)
    }
}

async fn parse_error(resp: reqwest::Response) -> ServiceError {
    let status = resp.status();
    parse_error_with_status(status, resp).await
}

async fn parse_error_with_status(status: StatusCode, resp: reqwest::Response) -> ServiceError {
    let body = resp.text().await.unwrap_or_default();
    let msg = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"].as_str().map(String::from))
        .unwrap_or(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Unauthorized(msg),
        StatusCode::NOT_FOUND => ServiceError::NotFound(msg),
        StatusCode::BAD_REQUEST => ServiceError::InvalidInput(msg),
        _ => ServiceError::Internal(msg),
    }
}

#[async_trait]
impl TodoService for HttpService {
    async fn list_tasks(&self) -> Result<Vec<Task>, ServiceError> {
        debug!("fetching tasks");
        let envelope: ItemsEnvelope = self.get_json("/todos").await?;
        Ok(envelope.items)
    }

    async fn create_task(&self, input: &CreateTaskRequest) -> Result<Task, ServiceError> {
        debug!(name = %input.name, "creating task");
        let envelope: ItemEnvelope = self.post_json("/todos", input).await?;
        Ok(envelope.item)
    }

    async fn update_task(
        &self,
        id: &str,
        update: &UpdateTaskRequest,
    ) -> Result<(), ServiceError> {
        debug!(%id, done = update.done, "updating task");
        self.patch_json(&format!("/todos/{id}"), update).await
    }

    async fn delete_task(&self, id: &str) -> Result<(), ServiceError> {
        debug!(%id, "deleting task");
        self.delete_req(&format!("/todos/{id}")).await
    }

    async fn attachment_upload_url(&self, id: &str) -> Result<String, ServiceError> {
        debug!(%id, "requesting upload url");
        let envelope: UploadUrlEnvelope =
            self.post_empty(&format!("/todos/{id}/attachment")).await?;
        Ok(envelope.upload_url)
    }

    async fn upload_file(&self, upload_url: &str, data: Bytes) -> Result<(), ServiceError> {
        debug!(bytes = data.len(), "uploading file");
        // Pre-signed target: the URL is the credential, so no auth header.
        let resp = self
            .client
            .put(upload_url)
            .body(data)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(parse_error(resp).await)
        }
    }
}
