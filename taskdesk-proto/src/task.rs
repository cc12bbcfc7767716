//! Task data model for `Taskdesk`.
//!
//! Defines the persisted [`Task`] record, the id-less [`TaskDraft`] used
//! for creation and import, and the status/priority enums. Field names and
//! literal values match the stored JSON layout (`dueDate`, `"InProgress"`).

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, globally unique task identifier.
///
/// New identifiers are UUID v7 strings, but any string read back from
/// storage is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wraps an existing identifier string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Progress state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not started.
    Pending,
    /// Actively being worked on.
    InProgress,
    /// Done.
    Completed,
}

impl TaskStatus {
    /// All statuses in workflow order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::InProgress, Self::Completed];
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Completed => write!(f, "Completed"),
        }
    }
}

/// Urgency of a task, ordered from least to most urgent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum TaskPriority {
    /// Can wait.
    Low,
    /// Normal priority.
    #[default]
    Medium,
    /// Should be done soon.
    High,
    /// Needs attention now.
    Urgent,
}

impl TaskPriority {
    /// All priorities from least to most urgent.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Urgent => write!(f, "Urgent"),
        }
    }
}

/// Reasons a task or draft is rejected before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::TitleEmpty);
    }
    Ok(())
}

/// A task as it is persisted and shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Stable identifier assigned at creation.
    pub id: TaskId,
    /// Short, non-empty title.
    pub title: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Calendar due date, stored as `YYYY-MM-DD`.
    pub due_date: NaiveDate,
    /// Progress state.
    pub status: TaskStatus,
    /// Urgency. Records written before priorities existed read as `Medium`.
    #[serde(default)]
    pub priority: TaskPriority,
}

impl Task {
    /// Builds a task from a draft and an assigned identifier.
    #[must_use]
    pub fn from_draft(id: TaskId, draft: TaskDraft) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            due_date: draft.due_date,
            status: draft.status,
            priority: draft.priority,
        }
    }

    /// Checks the title constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TitleEmpty`] for a blank title.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)
    }
}

/// A task that has not been assigned an identifier yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    /// Short, non-empty title.
    pub title: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Calendar due date.
    pub due_date: NaiveDate,
    /// Initial progress state.
    pub status: TaskStatus,
    /// Urgency, `Medium` when omitted.
    #[serde(default)]
    pub priority: TaskPriority,
}

impl TaskDraft {
    /// Creates a pending, medium-priority draft.
    pub fn new(title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Checks the title constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TitleEmpty`] for a blank title.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)
    }
}
