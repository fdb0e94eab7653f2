use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};
use taskdeck_core::Task;

pub struct TaskList {
    tasks: Vec<Task>,
    list_state: ListState,
}

impl TaskList {
    pub fn new(tasks: Vec<Task>) -> Self {
        let mut list_state = ListState::default();
        if !tasks.is_empty() {
            list_state.select(Some(0));
        }
        Self { tasks, list_state }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.list_state.selected().filter(|&i| i < self.tasks.len())
    }

    /// Returns the currently highlighted task, if any.
    pub fn selected_task(&self) -> Option<&Task> {
        self.tasks.get(self.selected_index()?)
    }

    /// Attempt to select the task with the given ID.
    /// Returns `true` if the task was found and selected.
    pub fn select_task_by_id(&mut self, task_id: &str) -> bool {
        match self.tasks.iter().position(|t| t.id == task_id) {
            Some(idx) => {
                self.list_state.select(Some(idx));
                true
            }
            None => false,
        }
    }

    /// Append a task at the end, selecting it when the list was empty.
    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
        if self.list_state.selected().is_none() {
            self.list_state.select(Some(0));
        }
    }

    /// Remove the task with the given ID. A no-op when no task matches.
    pub fn remove_by_id(&mut self, task_id: &str) {
        let Some(pos) = self.tasks.iter().position(|t| t.id == task_id) else {
            return;
        };
        self.tasks.remove(pos);
        if self.tasks.is_empty() {
            self.list_state.select(None);
        } else if let Some(sel) = self.list_state.selected() {
            if sel >= self.tasks.len() {
                self.list_state.select(Some(self.tasks.len() - 1));
            }
        }
    }

    /// Invert the completion flag of the task at `index`.
    pub fn flip_done(&mut self, index: usize) {
        if let Some(task) = self.tasks.get_mut(index) {
            task.done = !task.done;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                let current = self.list_state.selected().unwrap_or(0);
                if current + 1 < self.tasks.len() {
                    self.list_state.select(Some(current + 1));
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                let current = self.list_state.selected().unwrap_or(0);
                if current > 0 {
                    self.list_state.select(Some(current - 1));
                }
            }
            KeyCode::Char('g') => {
                if !self.tasks.is_empty() {
                    self.list_state.select(Some(0));
                }
            }
            KeyCode::Char('G') => {
                if !self.tasks.is_empty() {
                    self.list_state.select(Some(self.tasks.len() - 1));
                }
            }
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let title = format!(" Tasks ({}) ", self.tasks.len());
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let items: Vec<ListItem> = self
            .tasks
            .iter()
            .map(|task| {
                let checkbox = if task.done { "[x] " } else { "[ ] " };
                let checkbox_style = if task.done {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                let name_style = if task.done {
                    Style::default().fg(Color::DarkGray).crossed_out()
                } else {
                    Style::default()
                };
                let mut spans = vec![
                    Span::styled(checkbox, checkbox_style),
                    Span::styled(task.name.clone(), name_style),
                    Span::styled(
                        format!("  due {}", task.due_date),
                        Style::default().fg(Color::Yellow),
                    ),
                ];
                if task.attachment_url.is_some() {
                    spans.push(Span::styled("  [img]", Style::default().fg(Color::Magenta)));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan).bold())
            .highlight_symbol("> ");

        let mut state = self.list_state.clone();
        frame.render_stateful_widget(list, area, &mut state);
    }
}
