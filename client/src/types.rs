//! Domain DTOs for the todo API.
//!
//! # Design
//! `Todo` is the canonical record as the server returns it. The inputs are
//! separate types with explicit `Option` fields so that a payload only ever
//! contains what the caller set: `NewTodo` for creation (defaults are filled
//! client-side by `into_payload`), `TodoPatch` for partial updates, and
//! `EditDraft` for the detail view's editable copy.

use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// Creator recorded on new todos when the caller does not name one.
pub const DEFAULT_CREATOR: &str = "User";

/// Server-assigned identifier. The API may hand out numeric or string ids;
/// both are kept in the form received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TodoId {
    Number(u64),
    Text(String),
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TodoId::Number(n) => write!(f, "{n}"),
            TodoId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for TodoId {
    fn from(s: &str) -> Self {
        TodoId::Text(s.to_string())
    }
}

impl From<String> for TodoId {
    fn from(s: String) -> Self {
        TodoId::Text(s)
    }
}

impl From<u64> for TodoId {
    fn from(n: u64) -> Self {
        TodoId::Number(n)
    }
}

/// Workflow state of a todo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TodoStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TodoStatus {
    /// Human-readable label for the status badge.
    pub fn label(self) -> &'static str {
        match self {
            TodoStatus::Todo => "To Do",
            TodoStatus::InProgress => "In Progress",
            TodoStatus::Done => "Completed",
        }
    }

    pub fn is_done(self) -> bool {
        self == TodoStatus::Done
    }

    /// The status a completion checkbox flips to: done goes back to todo,
    /// anything else becomes done.
    pub fn toggled(self) -> Self {
        if self.is_done() {
            TodoStatus::Todo
        } else {
            TodoStatus::Done
        }
    }
}

/// A single todo item returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TodoStatus,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub creator: String,
}

/// Accepts `null`, `""`, a plain `YYYY-MM-DD` date, or an RFC 3339 timestamp.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else { return Ok(None) };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| Some(dt.date_naive()))
        .map_err(serde::de::Error::custom)
}

/// Format a due date for display, e.g. `Mar 7, 2025`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Caller input for creating a todo. Only `name` is required; unset fields
/// are filled with defaults by `into_payload` before the request is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewTodo {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
    pub date: Option<NaiveDate>,
    pub assignee: Option<String>,
    pub creator: Option<String>,
}

impl NewTodo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }

    /// Resolve every optional field, using `today` as the default date.
    pub fn into_payload(self, today: NaiveDate) -> CreateTodo {
        CreateTodo {
            name: self.name.trim().to_string(),
            description: trimmed_or_empty(self.description),
            status: self.status.unwrap_or_default(),
            date: self.date.unwrap_or(today),
            assignee: trimmed_or_empty(self.assignee),
            creator: self
                .creator
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CREATOR.to_string()),
        }
    }
}

fn trimmed_or_empty(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Request payload for creating a todo: every client-settable field present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTodo {
    pub name: String,
    pub description: String,
    pub status: TodoStatus,
    pub date: NaiveDate,
    pub assignee: String,
    pub creator: String,
}

/// Request payload for updating an existing todo. Only the fields that are
/// `Some` are serialized; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TodoStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

impl TodoPatch {
    pub fn status(status: TodoStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.date.is_none()
            && self.assignee.is_none()
    }
}

/// Editable copy of a todo's fields, owned by the detail view while editing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditDraft {
    pub name: String,
    pub description: String,
    pub assignee: String,
    pub status: TodoStatus,
}

impl EditDraft {
    pub fn from_todo(todo: &Todo) -> Self {
        Self {
            name: todo.name.clone(),
            description: todo.description.clone(),
            assignee: todo.assignee.clone(),
            status: todo.status,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }

    /// Fields that differ from `current`, with text trimmed.
    pub fn diff(&self, current: &Todo) -> TodoPatch {
        let changed = |draft: &str, current: &str| {
            let draft = draft.trim();
            (draft != current).then(|| draft.to_string())
        };
        TodoPatch {
            name: changed(&self.name, &current.name),
            description: changed(&self.description, &current.description),
            status: (self.status != current.status).then_some(self.status),
            date: None,
            assignee: changed(&self.assignee, &current.assignee),
        }
    }
}
