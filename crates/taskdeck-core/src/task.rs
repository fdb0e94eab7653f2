use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// A to-do item as the server reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "todoId")]
    pub id: String,
    /// Create responses can come back without a name; it decodes as empty.
    #[serde(default)]
    pub name: String,
    pub due_date: NaiveDate,
    pub done: bool,
    /// Present only after a successful attachment upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
}

impl Task {
    /// Update that inverts the completion flag, keeping name and due date.
    pub fn toggle_request(&self) -> UpdateTaskRequest {
        UpdateTaskRequest {
            name: self.name.clone(),
            due_date: self.due_date,
            done: !self.done,
        }
    }
}

/// The server assigns the id and defaults the completion flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub name: String,
    pub due_date: NaiveDate,
}

/// Full replacement of the mutable fields. The transport verb is PATCH but
/// the server expects every field present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub name: String,
    pub due_date: NaiveDate,
    pub done: bool,
}

/// New tasks fall due a week after the given day.
pub fn default_due_date(today: NaiveDate) -> NaiveDate {
    today + Days::new(7)
}
