use std::sync::Arc;

use bytes::Bytes;
use taskdeck_core::{CreateTaskRequest, Task, UpdateTaskRequest};
use tokio::runtime::Runtime;

use crate::{HttpService, ServiceError, TodoService, TokenProvider};

/// Blocking wrapper around the async `HttpService`.
///
/// Creates an internal tokio runtime and uses `block_on()` for each call.
/// Designed for sync callers like the TUI event loop.
pub struct BlockingService {
    inner: HttpService,
    rt: Runtime,
}

impl BlockingService {
    pub fn new(base_url: &str, token: Arc<dyn TokenProvider>) -> Self {
        Self {
            inner: HttpService::new(base_url, token),
            rt: Runtime::new().expect("failed to create tokio runtime"),
        }
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>, ServiceError> {
        self.rt.block_on(self.inner.list_tasks())
    }

    pub fn create_task(&self, input: &CreateTaskRequest) -> Result<Task, ServiceError> {
        self.rt.block_on(self.inner.create_task(input))
    }

    pub fn update_task(&self, id: &str, update: &UpdateTaskRequest) -> Result<(), ServiceError> {
        self.rt.block_on(self.inner.update_task(id, update))
    }

    pub fn delete_task(&self, id: &str) -> Result<(), ServiceError> {
        self.rt.block_on(self.inner.delete_task(id))
    }

    pub fn attachment_upload_url(&self, id: &str) -> Result<String, ServiceError> {
        self.rt.block_on(self.inner.attachment_upload_url(id))
    }

    pub fn upload_file(&self, upload_url: &str, data: Vec<u8>) -> Result<(), ServiceError> {
        self.rt
            .block_on(self.inner.upload_file(upload_url, Bytes::from(data)))
    }
}
