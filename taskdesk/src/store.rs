//! In-memory task state for the UI, kept in step with the repository.
//!
//! [`TaskStore`] is the single source of truth the UI renders from. Every
//! action follows the same shape:
//!
//! 1. clear the last error and raise the `loading` flag
//! 2. await one repository call (no retries)
//! 3. on success reconcile the in-memory collection from the response,
//!    on failure record the error message
//! 4. raise a success or error toast
//! 5. lower the `loading` flag
//!
//! The collection only changes on confirmed success, so a failed action
//! leaves the last known good view in place. `loading` is one flag shared
//! by all actions: with two actions in flight it drops as soon as either
//! one finishes.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use taskdesk_proto::query::TaskQuery;
use taskdesk_proto::task::{Task, TaskDraft, TaskId, ValidationError};

use crate::api::{ApiError, TaskRepository};
use crate::storage::KeyValueStorage;
use crate::toast::NotificationService;

/// Everything the UI renders from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskState {
    /// Cached collection, in repository order.
    pub tasks: Vec<Task>,
    /// `true` while a store action awaits the repository.
    pub loading: bool,
    /// Message of the most recent failure, cleared when an action starts.
    pub error: Option<String>,
    /// Task open in the editor, set only through [`TaskStore::set_editing`].
    pub editing: Option<Task>,
}

/// Store actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Replace the collection from the repository.
    Load,
    /// Create one task.
    Add,
    /// Create several tasks at once.
    Import,
    /// Replace one task.
    Update,
    /// Remove one task.
    Delete,
}

impl Action {
    /// Message shown when the action fails outside the simulated fault model.
    #[must_use]
    pub const fn connection_error_message(self) -> &'static str {
        match self {
            Self::Load => "Connection error while loading tasks.",
            Self::Add => "Connection error while adding the task.",
            Self::Import => "Connection error while importing tasks.",
            Self::Update => "Connection error while updating the task.",
            Self::Delete => "Connection error while deleting the task.",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Add => write!(f, "add"),
            Self::Import => write!(f, "import"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Category of an action failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Injected transient fault.
    Simulated,
    /// Update or delete target missing from the repository.
    NotFound,
    /// Stored data could not be decoded.
    Malformed,
    /// Input rejected before reaching the repository.
    Invalid,
    /// Storage failure outside the fault model.
    Unexpected,
}

/// A failed store action, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ActionError {
    /// Action that failed.
    pub action: Action,
    /// Failure category.
    pub kind: FailureKind,
    /// User-facing message, also stored as the last error.
    pub message: String,
}

impl ActionError {
    fn from_api(action: Action, err: ApiError) -> Self {
        let kind = match &err {
            ApiError::Simulated(_) => FailureKind::Simulated,
            ApiError::NotFound { .. } => FailureKind::NotFound,
            ApiError::Malformed(_) => FailureKind::Malformed,
            ApiError::Storage(source) => {
                tracing::error!(%action, error = %source, "unexpected storage failure");
                return Self {
                    action,
                    kind: FailureKind::Unexpected,
                    message: action.connection_error_message().to_string(),
                };
            }
        };
        Self {
            action,
            kind,
            message: err.to_string(),
        }
    }

    fn invalid(action: Action, err: &ValidationError) -> Self {
        Self {
            action,
            kind: FailureKind::Invalid,
            message: format!("Invalid task: {err}."),
        }
    }
}

/// Reactive task state backed by a [`TaskRepository`].
pub struct TaskStore<S: KeyValueStorage> {
    repository: Arc<TaskRepository<S>>,
    notifications: NotificationService,
    state: watch::Sender<TaskState>,
}

impl<S: KeyValueStorage> TaskStore<S> {
    /// Creates a store with an empty collection. Nothing is loaded until
    /// [`load`](Self::load) is called.
    pub fn new(repository: Arc<TaskRepository<S>>, notifications: NotificationService) -> Self {
        let (state, _) = watch::channel(TaskState::default());
        Self {
            repository,
            notifications,
            state,
        }
    }

    /// Returns the repository this store calls.
    pub fn repository(&self) -> &TaskRepository<S> {
        &self.repository
    }

    /// Returns the notification service toasts are raised on.
    pub const fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    /// Runs one repository call through the shared action shape.
    async fn run<T, Fut>(
        &self,
        action: Action,
        call: Fut,
        reconcile: impl FnOnce(&mut Vec<Task>, &T),
        success_message: impl FnOnce(&T) -> Option<String>,
    ) -> Result<T, ActionError>
    where
        Fut: Future<Output = Result<T, ActionError>>,
    {
        self.state.send_modify(|s| {
            s.error = None;
            s.loading = true;
        });

        let outcome = call.await;

        match &outcome {
            Ok(value) => {
                self.state.send_modify(|s| reconcile(&mut s.tasks, value));
                if let Some(message) = success_message(value) {
                    self.notifications.success(message);
                }
                tracing::info!(%action, "task action succeeded");
            }
            Err(err) => {
                self.state
                    .send_modify(|s| s.error = Some(err.message.clone()));
                self.notifications.error(err.message.clone());
                tracing::warn!(%action, kind = ?err.kind, error = %err, "task action failed");
            }
        }

        self.state.send_modify(|s| s.loading = false);
        outcome
    }

    /// Replaces the in-memory collection with the repository's.
    ///
    /// On failure the previous collection is kept.
    ///
    /// # Errors
    ///
    /// Returns the [`ActionError`] also recorded as the last error.
    pub async fn load(&self) -> Result<Vec<Task>, ActionError> {
        let action = Action::Load;
        self.run(
            action,
            async {
                self.repository
                    .fetch_all()
                    .await
                    .map_err(|e| ActionError::from_api(action, e))
            },
            |tasks, fetched: &Vec<Task>| tasks.clone_from(fetched),
            |_| None,
        )
        .await
    }

    /// Creates a task and appends it to the in-memory collection.
    ///
    /// # Errors
    ///
    /// Returns the [`ActionError`] also recorded as the last error.
    pub async fn add(&self, draft: TaskDraft) -> Result<Task, ActionError> {
        let action = Action::Add;
        self.run(
            action,
            async {
                draft
                    .validate()
                    .map_err(|e| ActionError::invalid(action, &e))?;
                self.repository
                    .create_one(draft)
                    .await
                    .map_err(|e| ActionError::from_api(action, e))
            },
            |tasks, created: &Task| tasks.push(created.clone()),
            |_| Some("Task created successfully.".to_string()),
        )
        .await
    }

    /// Creates several tasks in one repository write and appends them all.
    ///
    /// # Errors
    ///
    /// Returns the [`ActionError`] also recorded as the last error. If any
    /// draft is invalid, nothing is imported.
    pub async fn import_many(&self, drafts: Vec<TaskDraft>) -> Result<Vec<Task>, ActionError> {
        let action = Action::Import;
        self.run(
            action,
            async {
                for draft in &drafts {
                    draft
                        .validate()
                        .map_err(|e| ActionError::invalid(action, &e))?;
                }
                self.repository
                    .create_many(drafts)
                    .await
                    .map_err(|e| ActionError::from_api(action, e))
            },
            |tasks, created: &Vec<Task>| tasks.extend(created.iter().cloned()),
            |created| Some(format!("{} task(s) imported successfully.", created.len())),
        )
        .await
    }

    /// Replaces a task in the repository and in memory.
    ///
    /// If the in-memory copy disappeared while the call was in flight, the
    /// repository change stands but the collection is left as is.
    ///
    /// # Errors
    ///
    /// Returns the [`ActionError`] also recorded as the last error.
    pub async fn update(&self, task: Task) -> Result<Task, ActionError> {
        let action = Action::Update;
        self.run(
            action,
            async {
                task.validate()
                    .map_err(|e| ActionError::invalid(action, &e))?;
                self.repository
                    .update_one(task)
                    .await
                    .map_err(|e| ActionError::from_api(action, e))
            },
            |tasks, updated: &Task| {
                if let Some(slot) = tasks.iter_mut().find(|t| t.id == updated.id) {
                    slot.clone_from(updated);
                } else {
                    tracing::debug!(task_id = %updated.id, "updated task no longer cached");
                }
            },
            |_| Some("Task updated successfully.".to_string()),
        )
        .await
    }

    /// Deletes a task from the repository and from memory.
    ///
    /// # Errors
    ///
    /// Returns the [`ActionError`] also recorded as the last error.
    pub async fn delete(&self, id: &TaskId) -> Result<TaskId, ActionError> {
        let action = Action::Delete;
        self.run(
            action,
            async {
                self.repository
                    .delete_one(id)
                    .await
                    .map_err(|e| ActionError::from_api(action, e))
            },
            |tasks, deleted: &TaskId| tasks.retain(|t| t.id != *deleted),
            |_| Some("Task deleted successfully.".to_string()),
        )
        .await
    }

    /// Sets or clears the task open in the editor.
    pub fn set_editing(&self, task: Option<Task>) {
        self.state.send_modify(|s| s.editing = task);
    }

    /// Clears all in-memory state. Storage is not touched.
    pub fn reset(&self) {
        self.state.send_replace(TaskState::default());
    }

    /// Snapshot of the whole state.
    #[must_use]
    pub fn snapshot(&self) -> TaskState {
        self.state.borrow().clone()
    }

    /// Snapshot of the cached collection.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.state.borrow().tasks.clone()
    }

    /// Cached task with `id`, if any.
    #[must_use]
    pub fn task_by_id(&self, id: &TaskId) -> Option<Task> {
        self.state.borrow().tasks.iter().find(|t| t.id == *id).cloned()
    }

    /// Cached tasks filtered and ordered by `query`.
    #[must_use]
    pub fn query(&self, query: &TaskQuery) -> Vec<Task> {
        query.apply(&self.state.borrow().tasks)
    }

    /// Whether an action is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Message of the last failure, if the latest action failed.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Task open in the editor.
    #[must_use]
    pub fn editing(&self) -> Option<Task> {
        self.state.borrow().editing.clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.state.subscribe()
    }
}
