pub mod task;
pub mod upload;

pub use task::{CreateTaskRequest, Task, UpdateTaskRequest};
pub use upload::{UploadEvent, UploadState};
