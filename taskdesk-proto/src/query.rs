//! Filtering and sorting for task listings.
//!
//! Queries run over an in-memory slice and never touch storage. Sorting is
//! stable, so tasks with equal keys keep their insertion order.

use std::cmp::Ordering;

use crate::task::{Task, TaskPriority, TaskStatus};

/// Field a listing is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Storage order (no reordering).
    #[default]
    Insertion,
    /// Earliest due date first.
    DueDate,
    /// Least urgent first.
    Priority,
    /// Case-insensitive title.
    Title,
    /// Workflow order: pending, in progress, completed.
    Status,
}

/// Direction of a sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest key first.
    #[default]
    Ascending,
    /// Largest key first.
    Descending,
}

/// A filter plus an ordering over a task collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Only tasks with this status.
    pub status: Option<TaskStatus>,
    /// Only tasks with this priority.
    pub priority: Option<TaskPriority>,
    /// Case-insensitive substring of the title or description.
    pub text: Option<String>,
    /// Ordering key.
    pub sort: SortKey,
    /// Ordering direction.
    pub order: SortOrder,
}

impl TaskQuery {
    /// Returns `true` if the task passes every filter in this query.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        match self.text.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                task.title.to_lowercase().contains(&needle)
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
        }
    }

    /// Filters and orders `tasks`, returning owned copies.
    #[must_use]
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        let mut result: Vec<Task> = tasks.iter().filter(|t| self.matches(t)).cloned().collect();
        if self.sort != SortKey::Insertion {
            result.sort_by(|a, b| {
                let ord = compare(self.sort, a, b);
                match self.order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            });
        }
        result
    }
}

fn compare(key: SortKey, a: &Task, b: &Task) -> Ordering {
    match key {
        SortKey::Insertion => Ordering::Equal,
        SortKey::DueDate => a.due_date.cmp(&b.due_date),
        SortKey::Priority => a.priority.cmp(&b.priority),
        SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortKey::Status => a.status.cmp(&b.status),
    }
}
