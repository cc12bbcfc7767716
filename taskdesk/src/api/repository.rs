//! The simulated task backend.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use taskdesk_proto::codec;
use taskdesk_proto::task::{Task, TaskDraft, TaskId};

use super::{ApiError, ApiResult, FaultInjector, Operation};
use crate::storage::KeyValueStorage;

/// Storage key holding the serialized task collection.
pub const DEFAULT_STORAGE_KEY: &str = "tasks_spa";

/// Simulated network latency applied to every call.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// Task persistence behind a simulated, unreliable network.
///
/// Each call waits [`DEFAULT_DELAY`] (configurable), then asks the fault
/// injector whether to fail. Mutating calls re-fetch the whole collection
/// through [`fetch_all`](Self::fetch_all), modify it and write it back in
/// full. There is no locking: two overlapping mutations both read the same
/// snapshot and the later write silently discards the earlier one.
pub struct TaskRepository<S: KeyValueStorage> {
    storage: S,
    faults: Arc<dyn FaultInjector>,
    delay: Duration,
    key: String,
}

impl<S: KeyValueStorage> TaskRepository<S> {
    /// Creates a repository over `storage` with the default delay and key.
    pub fn new(storage: S, faults: Arc<dyn FaultInjector>) -> Self {
        Self {
            storage,
            faults,
            delay: DEFAULT_DELAY,
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    /// Overrides the simulated network delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Overrides the storage key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Returns the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the storage key in use.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Waits out the network delay, then rolls the fault for `operation`.
    async fn simulate_network(&self, operation: Operation) -> ApiResult<()> {
        tokio::time::sleep(self.delay).await;
        if self.faults.should_fail(operation) {
            tracing::debug!(%operation, "injected simulated failure");
            return Err(ApiError::Simulated(operation));
        }
        Ok(())
    }

    /// Persists the whole collection.
    ///
    /// Yields before writing, so concurrent read-modify-write cycles
    /// interleave here exactly as they would between two network callbacks.
    async fn write_all(&self, tasks: &[Task]) -> ApiResult<()> {
        let json = codec::encode_tasks(tasks)?;
        tokio::task::yield_now().await;
        self.storage.set_item(&self.key, json).await?;
        tracing::debug!(count = tasks.len(), key = %self.key, "task collection persisted");
        Ok(())
    }

    /// Reads the full task collection.
    ///
    /// Fails 20% of the time by default. A missing key reads as an empty
    /// collection.
    ///
    /// # Errors
    ///
    /// [`ApiError::Simulated`] on an injected fault, [`ApiError::Malformed`]
    /// if the stored data does not decode, [`ApiError::Storage`] if the
    /// backend fails.
    pub async fn fetch_all(&self) -> ApiResult<Vec<Task>> {
        self.simulate_network(Operation::FetchAll).await?;
        let Some(stored) = self.storage.get_item(&self.key).await? else {
            return Ok(Vec::new());
        };
        codec::decode_tasks(&stored).map_err(|err| {
            tracing::warn!(error = %err, key = %self.key, "stored task collection is malformed");
            ApiError::Malformed(err)
        })
    }

    /// Appends a new task with a freshly assigned id.
    ///
    /// # Errors
    ///
    /// [`ApiError::Simulated`] for its own fault or the nested fetch's
    /// fault, plus anything [`fetch_all`](Self::fetch_all) returns.
    pub async fn create_one(&self, draft: TaskDraft) -> ApiResult<Task> {
        self.simulate_network(Operation::CreateOne).await?;
        let mut tasks = self.fetch_all().await?;

        let id = fresh_id(&tasks.iter().map(|t| t.id.clone()).collect());
        let task = Task::from_draft(id, draft);
        tasks.push(task.clone());
        self.write_all(&tasks).await?;

        tracing::debug!(task_id = %task.id, "task created");
        Ok(task)
    }

    /// Appends several tasks in one write, returning them in input order.
    ///
    /// # Errors
    ///
    /// Same as [`create_one`](Self::create_one).
    pub async fn create_many(&self, drafts: Vec<TaskDraft>) -> ApiResult<Vec<Task>> {
        self.simulate_network(Operation::CreateMany).await?;
        let mut tasks = self.fetch_all().await?;

        let mut taken: HashSet<TaskId> = tasks.iter().map(|t| t.id.clone()).collect();
        let created: Vec<Task> = drafts
            .into_iter()
            .map(|draft| {
                let id = fresh_id(&taken);
                taken.insert(id.clone());
                Task::from_draft(id, draft)
            })
            .collect();
        tasks.extend(created.iter().cloned());
        self.write_all(&tasks).await?;

        tracing::debug!(count = created.len(), "tasks imported");
        Ok(created)
    }

    /// Replaces the stored task with the same id.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if no stored task has `task.id` (nothing is
    /// written), plus the errors of [`create_one`](Self::create_one).
    pub async fn update_one(&self, task: Task) -> ApiResult<Task> {
        self.simulate_network(Operation::UpdateOne).await?;
        let mut tasks = self.fetch_all().await?;

        let Some(slot) = tasks.iter_mut().find(|t| t.id == task.id) else {
            return Err(ApiError::NotFound {
                operation: Operation::UpdateOne,
                id: task.id,
            });
        };
        slot.clone_from(&task);
        self.write_all(&tasks).await?;

        tracing::debug!(task_id = %task.id, "task updated");
        Ok(task)
    }

    /// Removes every stored task with `id`, returning the id.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if nothing was removed (nothing is written),
    /// plus the errors of [`create_one`](Self::create_one).
    pub async fn delete_one(&self, id: &TaskId) -> ApiResult<TaskId> {
        self.simulate_network(Operation::DeleteOne).await?;
        let mut tasks = self.fetch_all().await?;

        let before = tasks.len();
        tasks.retain(|t| t.id != *id);
        if tasks.len() == before {
            return Err(ApiError::NotFound {
                operation: Operation::DeleteOne,
                id: id.clone(),
            });
        }
        self.write_all(&tasks).await?;

        tracing::debug!(task_id = %id, removed = before - tasks.len(), "task deleted");
        Ok(id.clone())
    }
}

/// Generates an id not present in `taken`.
fn fresh_id(taken: &HashSet<TaskId>) -> TaskId {
    loop {
        let id = TaskId::new();
        if !taken.contains(&id) {
            return id;
        }
    }
}
