//! In-process stand-in for the remote todo API, used by integration tests.
//!
//! Serves the same wire contract the client consumes: `{items}`/`{item}`
//! envelopes, camelCase fields, pre-signed upload URLs that point back at
//! the stub's own storage route.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::json;
use taskdeck_core::{CreateTaskRequest, Task, UpdateTaskRequest};
use tokio::net::TcpListener;

struct StubState {
    tasks: Vec<Task>,
    blobs: HashMap<String, Vec<u8>>,
    expected_token: Option<String>,
    base_url: String,
}

type Shared = Arc<Mutex<StubState>>;

/// A running stub server with its base URL and background task handle.
pub struct TestServer {
    pub base_url: String,
    _handle: tokio::task::JoinHandle<()>,
}

/// Spawn the stub on a random port, accepting any bearer token.
pub async fn spawn_test_server() -> TestServer {
    spawn(None).await
}

/// Spawn the stub on a random port, rejecting every request whose bearer
/// token is not `token`.
pub async fn spawn_test_server_with_token(token: &str) -> TestServer {
    spawn(Some(token.to_string())).await
}

async fn spawn(expected_token: Option<String>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");
    let state = Arc::new(Mutex::new(StubState {
        tasks: Vec::new(),
        blobs: HashMap::new(),
        expected_token,
        base_url: base_url.clone(),
    }));
    let app = router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        base_url,
        _handle: handle,
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}", patch(update_todo).delete(delete_todo))
        .route("/todos/{id}/attachment", post(attachment_url))
        .route("/storage/{id}", put(store_blob).get(fetch_blob))
        .with_state(state)
}

fn check_auth(state: &StubState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = &state.expected_token else {
        return Ok(());
    };
    let ok = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {expected}"));
    if ok {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "missing or invalid token"})),
        )
            .into_response())
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "task not found"})),
    )
        .into_response()
}

async fn list_todos(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().unwrap();
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }
    Json(json!({"items": state.tasks})).into_response()
}

async fn create_todo(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(input): Json<CreateTaskRequest>,
) -> Response {
    let mut state = state.lock().unwrap();
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }
    let task = Task {
        id: uuid::Uuid::new_v4().to_string(),
        name: input.name,
        due_date: input.due_date,
        done: false,
        attachment_url: None,
    };
    state.tasks.push(task.clone());
    // The real API drops empty names from the stored item, so the create
    // envelope can come back without a name field.
    let mut item = serde_json::to_value(&task).unwrap();
    if task.name.is_empty() {
        item.as_object_mut().unwrap().remove("name");
    }
    Json(json!({"item": item})).into_response()
}

async fn update_todo(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<UpdateTaskRequest>,
) -> Response {
    let mut state = state.lock().unwrap();
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }
    match state.tasks.iter_mut().find(|t| t.id == id) {
        Some(task) => {
            task.name = update.name;
            task.due_date = update.due_date;
            task.done = update.done;
            StatusCode::NO_CONTENT.into_response()
        }
        None => not_found(),
    }
}

async fn delete_todo(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap();
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }
    match state.tasks.iter().position(|t| t.id == id) {
        Some(pos) => {
            state.tasks.remove(pos);
            StatusCode::NO_CONTENT.into_response()
        }
        None => not_found(),
    }
}

async fn attachment_url(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let state = state.lock().unwrap();
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }
    if !state.tasks.iter().any(|t| t.id == id) {
        return not_found();
    }
    let url = format!("{}/storage/{id}", state.base_url);
    Json(json!({"uploadUrl": url})).into_response()
}

/// Pre-signed PUT target. No auth check: the URL itself is the grant.
/// Storing the object associates it with the task server-side.
async fn store_blob(State(state): State<Shared>, Path(id): Path<String>, body: Bytes) -> Response {
    let mut state = state.lock().unwrap();
    let url = format!("{}/storage/{id}", state.base_url);
    state.blobs.insert(id.clone(), body.to_vec());
    if let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) {
        task.attachment_url = Some(url);
    }
    StatusCode::OK.into_response()
}

async fn fetch_blob(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let state = state.lock().unwrap();
    match state.blobs.get(&id) {
        Some(data) => data.clone().into_response(),
        None => not_found(),
    }
}
