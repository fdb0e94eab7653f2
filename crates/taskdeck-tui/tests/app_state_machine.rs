//! State machine tests for the TUI App.
//!
//! Each test spawns the stub API server on a separate thread (the blocking
//! service owns its own tokio runtime, so the server must live in another
//! runtime), builds an App over a BlockingService, and drives it with key
//! events.

use std::sync::Arc;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use taskdeck_core::task::default_due_date;
use taskdeck_core::{CreateTaskRequest, UploadState};
use taskdeck_service::stub::{spawn_test_server, spawn_test_server_with_token};
use taskdeck_service::{BlockingService, StaticToken};
use taskdeck_tui::app::{App, Mode};

const TOKEN: &str = "test-token";

/// Spawn the stub server on a separate thread, return the base URL.
fn spawn_server() -> String {
    let (tx, rx) = std::sync::mpsc::sync_channel(1);
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let server = spawn_test_server().await;
            tx.send(server.base_url.clone()).unwrap();
            std::future::pending::<()>().await;
        });
    });
    rx.recv().unwrap()
}

fn service(url: &str) -> BlockingService {
    BlockingService::new(url, Arc::new(StaticToken(TOKEN.into())))
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn char_key(c: char) -> KeyEvent {
    key(KeyCode::Char(c))
}

fn type_str(app: &mut App, text: &str) {
    for c in text.chars() {
        app.handle_key(char_key(c));
    }
}

fn make_app() -> App {
    App::new(service(&spawn_server()))
}

/// Create an app with a task already on the server, returning (app, task_id).
fn make_app_with_task() -> (App, String) {
    let url = spawn_server();
    let svc = service(&url);
    let task = svc
        .create_task(&CreateTaskRequest {
            name: "Test Task".into(),
            due_date: default_due_date(Local::now().date_naive()),
        })
        .unwrap();
    (App::new(service(&url)), task.id)
}

// ---- Load ----

#[test]
fn app_starts_normal_with_empty_list() {
    let app = make_app();
    assert!(matches!(app.mode(), Mode::Normal));
    assert!(app.tasks().is_empty());
    assert!(!app.is_loading());
}

#[test]
fn load_replaces_list_preserving_order() {
    let url = spawn_server();
    let svc = service(&url);
    for name in ["A", "B", "C"] {
        svc.create_task(&CreateTaskRequest {
            name: name.into(),
            due_date: default_due_date(Local::now().date_naive()),
        })
        .unwrap();
    }

    let app = App::new(service(&url));
    let names: Vec<&str> = app.tasks().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["A", "B", "C"]);
}

#[test]
fn failed_load_alerts_and_leaves_list_empty() {
    let (tx, rx) = std::sync::mpsc::sync_channel(1);
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let server = spawn_test_server_with_token("other-token").await;
            tx.send(server.base_url.clone()).unwrap();
            std::future::pending::<()>().await;
        });
    });
    let url: String = rx.recv().unwrap();

    // Our token does not match, so the initial fetch is rejected.
    let app = App::new(service(&url));
    assert!(app.tasks().is_empty());
    assert!(!app.is_loading());
    assert!(app
        .status_message()
        .is_some_and(|m| m.contains("Failed to fetch tasks")));
}

// ---- Create ----

#[test]
fn n_enters_new_task() {
    let mut app = make_app();
    app.handle_key(char_key('n'));
    assert!(matches!(app.mode(), Mode::NewTask));
    assert!(app.is_input_mode());
}

#[test]
fn new_task_esc_cancels() {
    let mut app = make_app();
    app.handle_key(char_key('n'));
    app.handle_key(key(KeyCode::Esc));
    assert!(matches!(app.mode(), Mode::Normal));
}

#[test]
fn typing_edits_the_buffer() {
    let mut app = make_app();
    app.handle_key(char_key('n'));
    type_str(&mut app, "ab");
    app.handle_key(key(KeyCode::Backspace));
    assert_eq!(app.new_task_name(), "a");
}

#[test]
fn create_appends_and_clears_buffer() {
    let mut app = make_app();
    app.handle_key(char_key('n'));
    type_str(&mut app, "B");
    app.handle_key(key(KeyCode::Enter));

    assert!(matches!(app.mode(), Mode::Normal));
    assert_eq!(app.tasks().len(), 1);
    assert_eq!(app.tasks()[0].name, "B");
    assert!(!app.tasks()[0].done);
    assert_eq!(app.new_task_name(), "");
}

#[test]
fn create_due_date_is_a_week_out() {
    let mut app = make_app();
    app.handle_key(char_key('n'));
    type_str(&mut app, "B");
    app.handle_key(key(KeyCode::Enter));

    let expected = default_due_date(Local::now().date_naive());
    assert_eq!(app.tasks()[0].due_date, expected);
}

#[test]
fn create_with_nameless_response_leaves_list_unchanged() {
    let mut app = make_app();
    app.handle_key(char_key('n'));
    // Empty buffer: the stub omits the name from the created item, which
    // the controller treats as an empty result.
    app.handle_key(key(KeyCode::Enter));

    assert!(app.tasks().is_empty());
    assert!(matches!(app.mode(), Mode::NewTask));
}

// ---- Detail ----

#[test]
fn enter_opens_detail() {
    let (mut app, _id) = make_app_with_task();
    app.handle_key(key(KeyCode::Enter));
    assert!(matches!(app.mode(), Mode::TaskDetail { .. }));
}

#[test]
fn detail_esc_returns() {
    let (mut app, _id) = make_app_with_task();
    app.handle_key(key(KeyCode::Enter));
    app.handle_key(key(KeyCode::Esc));
    assert!(matches!(app.mode(), Mode::Normal));
}

// ---- Delete ----

#[test]
fn d_confirms_then_y_deletes() {
    let (mut app, _id) = make_app_with_task();
    app.handle_key(char_key('d'));
    assert!(matches!(app.mode(), Mode::ConfirmDelete { .. }));
    app.handle_key(char_key('y'));
    assert!(matches!(app.mode(), Mode::Normal));
    assert!(app.tasks().is_empty());
}

#[test]
fn confirm_delete_any_other_key_cancels() {
    let (mut app, _id) = make_app_with_task();
    app.handle_key(char_key('d'));
    app.handle_key(char_key('x'));
    assert!(matches!(app.mode(), Mode::Normal));
    assert_eq!(app.tasks().len(), 1);
}

// ---- Toggle done ----

#[test]
fn space_toggles_done_on_success() {
    let (mut app, _id) = make_app_with_task();
    assert!(!app.tasks()[0].done);

    app.handle_key(char_key(' '));
    assert!(app.tasks()[0].done);

    app.handle_key(char_key(' '));
    assert!(!app.tasks()[0].done);
}

#[test]
fn toggle_failure_leaves_flag_unchanged() {
    let url = spawn_server();
    let svc = service(&url);
    let task = svc
        .create_task(&CreateTaskRequest {
            name: "Test Task".into(),
            due_date: default_due_date(Local::now().date_naive()),
        })
        .unwrap();
    let mut app = App::new(service(&url));

    // Delete the task behind the client's back so the update 404s.
    svc.delete_task(&task.id).unwrap();

    app.handle_key(char_key(' '));
    assert!(!app.tasks()[0].done);
    assert!(app
        .status_message()
        .is_some_and(|m| m.contains("Task update failed")));
}

// ---- Upload ----

#[test]
fn u_enters_attach_input() {
    let (mut app, _id) = make_app_with_task();
    app.handle_key(char_key('u'));
    assert!(matches!(app.mode(), Mode::AttachInput { .. }));
    assert!(app.is_input_mode());
    assert_eq!(app.upload_state(), UploadState::NoUpload);
}

#[test]
fn upload_happy_path_walks_every_state() {
    let (mut app, _id) = make_app_with_task();

    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"fake image bytes").unwrap();

    app.handle_key(char_key('u'));
    type_str(&mut app, &file.path().display().to_string());
    assert_eq!(app.upload_state(), UploadState::NoUpload);

    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.upload_state(), UploadState::FetchingPresignedUrl);
    assert!(app.needs_polling());

    app.advance_upload();
    assert_eq!(app.upload_state(), UploadState::UploadingFile);

    app.advance_upload();
    assert_eq!(app.upload_state(), UploadState::NoUpload);
    assert!(matches!(app.mode(), Mode::Normal));
    assert!(app.tasks()[0].attachment_url.is_some());
}

#[test]
fn submit_with_no_file_is_a_no_op() {
    let (mut app, _id) = make_app_with_task();
    app.handle_key(char_key('u'));
    app.handle_key(key(KeyCode::Enter));

    // No transition, no upload started.
    assert!(matches!(app.mode(), Mode::AttachInput { .. }));
    assert_eq!(app.upload_state(), UploadState::NoUpload);
}

#[test]
fn upload_failure_resets_to_idle() {
    let url = spawn_server();
    let svc = service(&url);
    let task = svc
        .create_task(&CreateTaskRequest {
            name: "Test Task".into(),
            due_date: default_due_date(Local::now().date_naive()),
        })
        .unwrap();
    let mut app = App::new(service(&url));

    // Remove the task behind the client's back; the URL request will 404.
    svc.delete_task(&task.id).unwrap();

    app.handle_key(char_key('u'));
    type_str(&mut app, "/no/such/file.png");
    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.upload_state(), UploadState::FetchingPresignedUrl);

    app.advance_upload();
    assert_eq!(app.upload_state(), UploadState::NoUpload);
    assert!(matches!(app.mode(), Mode::Normal));
    assert!(app
        .status_message()
        .is_some_and(|m| m.contains("Could not upload a file")));
}

#[test]
fn unreadable_file_resets_to_idle() {
    let (mut app, _id) = make_app_with_task();

    app.handle_key(char_key('u'));
    type_str(&mut app, "/no/such/file.png");
    app.handle_key(key(KeyCode::Enter));

    app.advance_upload(); // fetch URL, fine
    assert_eq!(app.upload_state(), UploadState::UploadingFile);

    app.advance_upload(); // read fails
    assert_eq!(app.upload_state(), UploadState::NoUpload);
    assert!(matches!(app.mode(), Mode::Normal));
    assert!(app
        .status_message()
        .is_some_and(|m| m.contains("Could not upload a file")));
    assert!(app.tasks()[0].attachment_url.is_none());
}
