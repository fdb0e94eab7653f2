use std::path::PathBuf;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use taskdeck_core::task::default_due_date;
use taskdeck_core::{CreateTaskRequest, Task, UploadEvent, UploadState};
use taskdeck_service::BlockingService;

use crate::components::task_list::TaskList;

/// What the app is currently doing
#[derive(Debug, Clone)]
pub enum Mode {
    /// Normal list navigation
    Normal,
    /// Typing a new task name (the buffer lives on `App`)
    NewTask,
    /// Viewing task detail
    TaskDetail { task: Task },
    /// Confirm delete task
    ConfirmDelete { task: Task },
    /// Typing the path of a file to attach
    AttachInput { task: Task, input: String },
    /// Two-phase attachment upload in flight, advanced from the event loop
    Uploading {
        task: Task,
        file: PathBuf,
        state: UploadState,
        upload_url: Option<String>,
    },
}

pub struct App {
    service: BlockingService,
    list: TaskList,
    mode: Mode,
    new_task_name: String,
    status_message: Option<String>,
    /// True until the initial fetch resolves, success or not.
    loading_tasks: bool,
    /// True while a mutation round trip is in flight.
    busy: bool,
}

impl App {
    pub fn new(service: BlockingService) -> Self {
        let mut app = Self {
            service,
            list: TaskList::new(Vec::new()),
            mode: Mode::Normal,
            new_task_name: String::new(),
            status_message: None,
            loading_tasks: true,
            busy: false,
        };
        app.load_tasks();
        app
    }

    /// Initial fetch. The list stays as it was (empty) when the call fails.
    fn load_tasks(&mut self) {
        match self.service.list_tasks() {
            Ok(tasks) => self.list = TaskList::new(tasks),
            Err(e) => self.status_message = Some(format!("Failed to fetch tasks: {e}")),
        }
        self.loading_tasks = false;
    }

    /// Re-fetch the list, keeping the current selection where possible.
    fn refresh(&mut self) {
        let selected_id = self.list.selected_task().map(|t| t.id.clone());
        match self.service.list_tasks() {
            Ok(tasks) => {
                self.list = TaskList::new(tasks);
                if let Some(id) = selected_id {
                    self.list.select_task_by_id(&id);
                }
            }
            Err(e) => self.status_message = Some(format!("Failed to fetch tasks: {e}")),
        }
    }

    // -- State exposed for rendering and tests --

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn tasks(&self) -> &[Task] {
        self.list.tasks()
    }

    pub fn new_task_name(&self) -> &str {
        &self.new_task_name
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading_tasks
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// The upload indicator, `NoUpload` whenever no attempt is in flight.
    pub fn upload_state(&self) -> UploadState {
        match &self.mode {
            Mode::Uploading { state, .. } => *state,
            _ => UploadState::NoUpload,
        }
    }

    pub fn is_input_mode(&self) -> bool {
        matches!(self.mode, Mode::NewTask | Mode::AttachInput { .. })
    }

    /// True when the event loop should use a poll timeout instead of
    /// blocking, so the upload can be advanced between renders.
    pub fn needs_polling(&self) -> bool {
        matches!(self.mode, Mode::Uploading { .. })
    }

    /// 'q' quits only from the top-level list.
    pub fn can_quit(&self) -> bool {
        matches!(self.mode, Mode::Normal)
    }

    // -- Key handling --

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.status_message = None;

        match &self.mode.clone() {
            Mode::Normal => self.handle_normal(key),
            Mode::NewTask => self.handle_new_task(key),
            Mode::TaskDetail { task } => self.handle_task_detail(key, task.clone()),
            Mode::ConfirmDelete { task } => self.handle_confirm_delete(key, task.clone()),
            Mode::AttachInput { task, input } => {
                self.handle_attach_input(key, task.clone(), input.clone())
            }
            // No cancellation: an issued request runs to completion.
            Mode::Uploading { .. } => {}
        }
    }

    fn handle_normal(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('n') => self.mode = Mode::NewTask,
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char(' ') => {
                if let Some(index) = self.list.selected_index() {
                    self.toggle_done(index);
                }
            }
            KeyCode::Enter => {
                if let Some(task) = self.list.selected_task() {
                    self.mode = Mode::TaskDetail { task: task.clone() };
                }
            }
            KeyCode::Char('d') => {
                if let Some(task) = self.list.selected_task() {
                    self.mode = Mode::ConfirmDelete { task: task.clone() };
                }
            }
            KeyCode::Char('u') => {
                if let Some(task) = self.list.selected_task() {
                    self.mode = Mode::AttachInput {
                        task: task.clone(),
                        input: String::new(),
                    };
                }
            }
            _ => self.list.handle_key(key),
        }
    }

    fn handle_new_task(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.create_task(),
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Backspace => {
                self.new_task_name.pop();
            }
            KeyCode::Char(c) => self.new_task_name.push(c),
            _ => {}
        }
    }

    fn handle_task_detail(&mut self, key: KeyEvent, task: Task) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.mode = Mode::Normal,
            KeyCode::Char('u') => {
                self.mode = Mode::AttachInput {
                    task,
                    input: String::new(),
                };
            }
            KeyCode::Char('d') => self.mode = Mode::ConfirmDelete { task },
            _ => {}
        }
    }

    fn handle_confirm_delete(&mut self, key: KeyEvent, task: Task) {
        if key.code == KeyCode::Char('y') {
            self.delete_task(task);
        } else {
            self.mode = Mode::Normal;
        }
    }

    fn handle_attach_input(&mut self, key: KeyEvent, task: Task, mut input: String) {
        match key.code {
            KeyCode::Enter => {
                let path = input.trim().to_string();
                // Submitting with no file selected is a no-op.
                if path.is_empty() {
                    return;
                }
                self.mode = Mode::Uploading {
                    task,
                    file: PathBuf::from(path),
                    state: UploadState::NoUpload.apply(UploadEvent::Submit),
                    upload_url: None,
                };
            }
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Backspace => {
                input.pop();
                self.mode = Mode::AttachInput { task, input };
            }
            KeyCode::Char(c) => {
                input.push(c);
                self.mode = Mode::AttachInput { task, input };
            }
            _ => {}
        }
    }

    // -- Actions --

    fn create_task(&mut self) {
        self.busy = true;
        let due_date = default_due_date(Local::now().date_naive());
        let result = self.service.create_task(&CreateTaskRequest {
            name: self.new_task_name.clone(),
            due_date,
        });
        self.busy = false;
        match result {
            // The server can answer with an item that has no name; treat
            // that as an empty result and leave the list and input alone.
            Ok(task) if task.name.is_empty() => {}
            Ok(task) => {
                self.list.push(task);
                self.new_task_name.clear();
                self.mode = Mode::Normal;
                self.status_message = Some("Task created".into());
            }
            Err(_) => self.status_message = Some("Task creation failed".into()),
        }
    }

    fn delete_task(&mut self, task: Task) {
        self.busy = true;
        let result = self.service.delete_task(&task.id);
        self.busy = false;
        match result {
            Ok(()) => {
                self.list.remove_by_id(&task.id);
                self.status_message = Some(format!("Deleted: {}", task.name));
            }
            Err(_) => self.status_message = Some("Task deletion failed".into()),
        }
        self.mode = Mode::Normal;
    }

    fn toggle_done(&mut self, index: usize) {
        let (id, update) = match self.list.get(index) {
            Some(task) => (task.id.clone(), task.toggle_request()),
            None => return,
        };
        self.busy = true;
        let result = self.service.update_task(&id, &update);
        self.busy = false;
        match result {
            // The local flag flips only once the server accepted the update.
            Ok(()) => self.list.flip_done(index),
            Err(_) => self.status_message = Some("Task update failed".into()),
        }
    }

    /// Run the next step of an in-flight upload. Called on timeout from the
    /// event loop so every state gets rendered.
    pub fn advance_upload(&mut self) {
        let Mode::Uploading {
            task,
            file,
            state,
            upload_url,
        } = self.mode.clone()
        else {
            return;
        };
        match state {
            UploadState::FetchingPresignedUrl => {
                match self.service.attachment_upload_url(&task.id) {
                    Ok(url) => {
                        self.mode = Mode::Uploading {
                            task,
                            file,
                            state: state.apply(UploadEvent::UrlObtained),
                            upload_url: Some(url),
                        };
                    }
                    Err(e) => {
                        self.status_message = Some(format!("Could not upload a file: {e}"));
                        self.mode = Mode::Normal;
                    }
                }
            }
            UploadState::UploadingFile => {
                let outcome = std::fs::read(&file)
                    .map_err(|e| format!("read {}: {e}", file.display()))
                    .and_then(|data| {
                        let url = upload_url.as_deref().unwrap_or_default();
                        self.service
                            .upload_file(url, data)
                            .map_err(|e| e.to_string())
                    });
                match outcome {
                    Ok(()) => {
                        self.status_message = Some("File uploaded".into());
                        self.refresh();
                        self.list.select_task_by_id(&task.id);
                    }
                    Err(e) => {
                        self.status_message = Some(format!("Could not upload a file: {e}"));
                    }
                }
                // The reset runs on success and failure alike.
                self.mode = Mode::Normal;
            }
            UploadState::NoUpload => self.mode = Mode::Normal,
        }
    }

    // -- Rendering --

    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        self.render_title_bar(frame, layout[0]);
        if self.loading_tasks {
            let loading = Paragraph::new("Loading tasks...")
                .block(Block::default().borders(Borders::ALL))
                .alignment(Alignment::Center);
            frame.render_widget(loading, layout[1]);
        } else {
            self.list.render(frame, layout[1]);
        }
        self.render_status_bar(frame, layout[2]);

        // Overlays
        match &self.mode {
            Mode::Normal => {}
            Mode::NewTask => {
                self.render_input_bar(frame, "New task: ", &self.new_task_name, area)
            }
            Mode::TaskDetail { task } => self.render_task_detail(frame, task, area),
            Mode::ConfirmDelete { task } => self.render_confirm_delete_dialog(frame, task, area),
            Mode::AttachInput { input, .. } => {
                self.render_input_bar(frame, "Attach image (path): ", input, area)
            }
            Mode::Uploading { file, state, .. } => {
                self.render_uploading(frame, file, *state, area)
            }
        }
    }

    fn render_title_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(" taskdeck ", Style::default().bold().fg(Color::Cyan)),
            Span::raw("| "),
            Span::styled(
                format!("{} tasks", self.list.len()),
                Style::default().fg(Color::Yellow),
            ),
        ];
        if self.busy {
            spans.push(Span::styled(" | working...", Style::default().fg(Color::Magenta)));
        }
        frame.render_widget(Line::from(spans), area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        if let Some(ref msg) = self.status_message {
            let line = Line::from(Span::styled(
                format!(" {msg}"),
                Style::default().fg(Color::Green),
            ));
            frame.render_widget(line, area);
            return;
        }

        let hints = match &self.mode {
            Mode::Normal => vec![
                ("q", "quit"),
                ("j/k", "move"),
                ("n", "new"),
                ("Space", "done"),
                ("Enter", "detail"),
                ("d", "del"),
                ("u", "attach"),
                ("r", "refresh"),
            ],
            Mode::NewTask => vec![("Enter", "create"), ("Esc", "cancel")],
            Mode::TaskDetail { .. } => vec![("u", "attach"), ("d", "del"), ("Esc", "back")],
            Mode::ConfirmDelete { .. } => vec![("y", "confirm"), ("any", "cancel")],
            Mode::AttachInput { .. } => vec![("Enter", "upload"), ("Esc", "cancel")],
            Mode::Uploading { .. } => vec![("", "uploading, please wait")],
        };

        let spans: Vec<Span> = hints
            .into_iter()
            .flat_map(|(key, desc)| {
                vec![
                    Span::styled(format!(" {key}"), Style::default().fg(Color::Yellow).bold()),
                    Span::raw(format!(" {desc} ")),
                ]
            })
            .collect();

        frame.render_widget(Line::from(spans), area);
    }

    fn render_input_bar(&self, frame: &mut Frame, label: &str, input: &str, area: Rect) {
        let input_area = Rect {
            x: area.x,
            y: area.y + area.height.saturating_sub(3),
            width: area.width,
            height: 3,
        };
        frame.render_widget(Clear, input_area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(label);
        let paragraph = Paragraph::new(input).block(block);
        frame.render_widget(paragraph, input_area);
    }

    fn render_task_detail(&self, frame: &mut Frame, task: &Task, area: Rect) {
        let popup = centered_rect(60, 50, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(" Task ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let done_text = if task.done { "done" } else { "open" };
        let lines = vec![
            Line::from(vec![
                Span::styled("Name: ", Style::default().bold()),
                Span::raw(&task.name),
            ]),
            Line::from(vec![
                Span::styled("Due: ", Style::default().bold()),
                Span::raw(task.due_date.to_string()),
            ]),
            Line::from(vec![
                Span::styled("Status: ", Style::default().bold()),
                Span::raw(done_text),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled("Attachment: ", Style::default().bold()),
                Span::raw(task.attachment_url.as_deref().unwrap_or("(none)")),
            ]),
        ];

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, inner);
    }

    fn render_confirm_delete_dialog(&self, frame: &mut Frame, task: &Task, area: Rect) {
        let popup = centered_rect(50, 20, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(" Confirm Delete ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));

        let text = format!("Delete \"{}\"?\n\n(y)es / (any key) cancel", task.name);
        let paragraph = Paragraph::new(text)
            .block(block)
            .wrap(Wrap { trim: false })
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, popup);
    }

    fn render_uploading(&self, frame: &mut Frame, file: &std::path::Path, state: UploadState, area: Rect) {
        let popup = centered_rect(50, 20, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(" Upload ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let text = format!("{}\n\n{}", state.display_name(), file.display());
        let paragraph = Paragraph::new(text)
            .block(block)
            .wrap(Wrap { trim: false })
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, popup);
    }
}

/// A centered rect taking the given percentage of the area.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
