//! Integration tests for the task store over the simulated repository.
//!
//! Covers the action shape shared by load/add/import/update/delete: error
//! clearing, the coarse loading flag, reconcile-on-success, toasts, and the
//! failure paths (simulated faults, missing tasks, validation, storage).

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::similar_names,
    clippy::redundant_clone
)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use taskdesk::api::{FailOn, FaultInjector, NoFaults, Operation, ScriptedFaults, TaskRepository};
use taskdesk::config::ClientConfig;
use taskdesk::context::AppContext;
use taskdesk::storage::{FileStorage, KeyValueStorage, MemoryStorage};
use taskdesk::store::{FailureKind, TaskState, TaskStore};
use taskdesk::toast::{NotificationService, Severity};
use taskdesk_proto::query::{SortKey, TaskQuery};
use taskdesk_proto::task::{TaskDraft, TaskId, TaskPriority, TaskStatus};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

const DELAY: Duration = Duration::from_millis(500);

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Store with the default 500 ms latency over in-memory storage.
fn make_store(faults: Arc<dyn FaultInjector>) -> TaskStore<MemoryStorage> {
    make_store_over(MemoryStorage::new(), faults)
}

fn make_store_over(
    storage: MemoryStorage,
    faults: Arc<dyn FaultInjector>,
) -> TaskStore<MemoryStorage> {
    let repo = TaskRepository::new(storage, faults).with_delay(DELAY);
    TaskStore::new(Arc::new(repo), NotificationService::new())
}

fn messages(store: &TaskStore<MemoryStorage>) -> Vec<(Severity, String)> {
    store
        .notifications()
        .toasts()
        .into_iter()
        .map(|t| (t.severity, t.message))
        .collect()
}

async fn stored_len(store: &TaskStore<MemoryStorage>) -> usize {
    let raw = store
        .repository()
        .storage()
        .get_item(store.repository().key())
        .await
        .unwrap()
        .unwrap_or_else(|| "[]".to_string());
    taskdesk_proto::codec::decode_tasks(&raw).unwrap().len()
}

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn add_buy_milk_end_to_end() {
    let store = make_store(Arc::new(NoFaults));
    let draft = TaskDraft::new("Buy milk", date(2024, 6, 1));

    let (result, loading_midway) = tokio::join!(store.add(draft), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.is_loading()
    });

    let task = result.unwrap();
    assert!(loading_midway);
    assert!(!store.is_loading());
    assert_eq!(store.error(), None);
    assert_eq!(task.title, "Buy milk");
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(store.tasks(), vec![task.clone()]);
    assert_eq!(
        messages(&store),
        vec![(Severity::Success, "Task created successfully.".to_string())]
    );

    // Persisted: a fresh load sees the same task.
    store.reset();
    store.load().await.unwrap();
    assert_eq!(store.tasks(), vec![task]);
}

#[tokio::test(start_paused = true)]
async fn import_three_reports_count() {
    let store = make_store(Arc::new(NoFaults));
    let drafts = vec![
        TaskDraft::new("one", date(2024, 1, 1)),
        TaskDraft::new("two", date(2024, 1, 2)).with_priority(TaskPriority::High),
        TaskDraft::new("three", date(2024, 1, 3)).with_status(TaskStatus::Completed),
    ];

    let created = store.import_many(drafts).await.unwrap();

    assert_eq!(created.len(), 3);
    let titles: Vec<_> = store.tasks().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["one", "two", "three"]);
    assert_eq!(
        messages(&store).last().unwrap().1,
        "3 task(s) imported successfully."
    );
    assert_eq!(stored_len(&store).await, 3);
}

#[tokio::test(start_paused = true)]
async fn update_and_delete_reconcile_in_memory() {
    let store = make_store(Arc::new(NoFaults));
    let a = store.add(TaskDraft::new("a", date(2024, 1, 1))).await.unwrap();
    let b = store.add(TaskDraft::new("b", date(2024, 1, 2))).await.unwrap();

    let mut edited = a.clone();
    edited.status = TaskStatus::InProgress;
    store.update(edited.clone()).await.unwrap();
    assert_eq!(store.tasks(), vec![edited.clone(), b.clone()]);

    store.delete(&b.id).await.unwrap();
    assert_eq!(store.tasks(), vec![edited]);
    assert_eq!(stored_len(&store).await, 1);
    assert_eq!(
        messages(&store).last().unwrap(),
        &(Severity::Success, "Task deleted successfully.".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn query_sorts_cached_tasks() {
    let store = make_store(Arc::new(NoFaults));
    store
        .import_many(vec![
            TaskDraft::new("late", date(2024, 3, 1)),
            TaskDraft::new("early", date(2024, 1, 1)),
        ])
        .await
        .unwrap();

    let query = TaskQuery {
        sort: SortKey::DueDate,
        ..TaskQuery::default()
    };
    let titles: Vec<_> = store.query(&query).into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["early", "late"]);
}

#[tokio::test(start_paused = true)]
async fn load_replaces_cache_with_repository_order() {
    let store = make_store(Arc::new(NoFaults));
    let a = store.add(TaskDraft::new("a", date(2024, 1, 1))).await.unwrap();
    let b = store.add(TaskDraft::new("b", date(2024, 1, 2))).await.unwrap();
    let c = store.add(TaskDraft::new("c", date(2024, 1, 3))).await.unwrap();

    // Storage changes behind the store's back.
    store.repository().delete_one(&b.id).await.unwrap();
    assert_eq!(store.tasks(), vec![a.clone(), b, c.clone()]);

    let loaded = store.load().await.unwrap();

    let fetched = store.repository().fetch_all().await.unwrap();
    assert_eq!(loaded, fetched);
    assert_eq!(store.tasks(), fetched);
    assert_eq!(store.tasks(), vec![a, c]);
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn forced_delete_failure_keeps_task() {
    let store = make_store(Arc::new(FailOn::new([Operation::DeleteOne])));
    let task = store.add(TaskDraft::new("keep", date(2024, 1, 1))).await.unwrap();

    let err = store.delete(&task.id).await.unwrap_err();

    assert_eq!(err.kind, FailureKind::Simulated);
    assert_eq!(store.tasks(), vec![task]);
    assert_eq!(
        store.error().as_deref(),
        Some("Simulated error while deleting the task.")
    );
    assert_eq!(
        messages(&store).last().unwrap(),
        &(
            Severity::Error,
            "Simulated error while deleting the task.".to_string()
        )
    );
    assert!(!store.is_loading());
    assert_eq!(stored_len(&store).await, 1);
}

#[tokio::test(start_paused = true)]
async fn load_failure_keeps_stale_collection() {
    let faults = Arc::new(ScriptedFaults::default());
    let store = make_store(faults.clone());
    store.add(TaskDraft::new("cached", date(2024, 1, 1))).await.unwrap();

    faults.push(true);
    let before = store.tasks();
    let err = store.load().await.unwrap_err();

    assert_eq!(err.message, "Simulated network error while fetching tasks.");
    assert_eq!(store.tasks(), before);
    assert!(!store.is_loading());
}

#[tokio::test(start_paused = true)]
async fn nested_fetch_failure_surfaces_fetch_message() {
    // createOne's own roll passes, the nested fetch fails.
    let faults = Arc::new(ScriptedFaults::new([false, true]));
    let store = make_store(faults.clone());

    let err = store
        .add(TaskDraft::new("x", date(2024, 1, 1)))
        .await
        .unwrap_err();

    assert_eq!(err.message, "Simulated network error while fetching tasks.");
    assert_eq!(faults.rolls(), vec![Operation::CreateOne, Operation::FetchAll]);
    assert!(store.tasks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn update_of_deleted_task_is_not_found() {
    let store = make_store(Arc::new(NoFaults));
    let task = store.add(TaskDraft::new("x", date(2024, 1, 1))).await.unwrap();
    store.repository().delete_one(&task.id).await.unwrap();

    let mut edited = task.clone();
    edited.title = "y".to_string();
    let err = store.update(edited).await.unwrap_err();

    assert_eq!(err.kind, FailureKind::NotFound);
    assert_eq!(err.message, "Task not found for update.");
    // Cache is not touched on failure.
    assert_eq!(store.tasks(), vec![task]);
}

#[tokio::test(start_paused = true)]
async fn delete_of_unknown_id_is_not_found() {
    let store = make_store(Arc::new(NoFaults));
    let err = store
        .delete(&TaskId::from_string("missing"))
        .await
        .unwrap_err();
    assert_eq!(err.message, "Task not found for deletion.");
}

#[tokio::test(start_paused = true)]
async fn invalid_import_writes_nothing() {
    let store = make_store(Arc::new(NoFaults));
    let err = store
        .import_many(vec![
            TaskDraft::new("fine", date(2024, 1, 1)),
            TaskDraft::new("", date(2024, 1, 2)),
        ])
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Invalid);
    assert!(store.tasks().is_empty());
    assert_eq!(stored_len(&store).await, 0);
    assert_eq!(messages(&store)[0].0, Severity::Error);
}

#[tokio::test(start_paused = true)]
async fn long_title_is_accepted() {
    let store = make_store(Arc::new(NoFaults));
    let title = "x".repeat(300);

    let task = store
        .add(TaskDraft::new(title.clone(), date(2024, 1, 1)))
        .await
        .unwrap();
    assert_eq!(task.title, title);
    assert_eq!(store.tasks(), vec![task.clone()]);
    assert_eq!(stored_len(&store).await, 1);

    let mut edited = task.clone();
    edited.title = "y".repeat(1000);
    let updated = store.update(edited.clone()).await.unwrap();
    assert_eq!(updated, edited);
    assert_eq!(store.tasks(), vec![edited]);
    assert!(store.error().is_none());
}

#[tokio::test(start_paused = true)]
async fn malformed_storage_reports_internal_error() {
    let store = make_store_over(
        MemoryStorage::with_item("tasks_spa", "{not an array"),
        Arc::new(NoFaults),
    );
    let err = store.load().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Malformed);
    assert_eq!(err.message, "Internal error while processing task data.");
}

#[tokio::test(start_paused = true)]
async fn quota_exceeded_is_connection_error() {
    let store = make_store_over(MemoryStorage::with_quota(64), Arc::new(NoFaults));
    let err = store
        .import_many(vec![TaskDraft::new(
            "a title long enough to overflow the quota",
            date(2024, 1, 1),
        )])
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Unexpected);
    assert_eq!(err.message, "Connection error while importing tasks.");
    assert!(store.tasks().is_empty());
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn loading_flag_is_shared_between_actions() {
    let store = make_store(Arc::new(NoFaults));

    // load takes one delay, add takes two; the flag drops when load finishes.
    let (load, add, loading_between) = tokio::join!(
        store.load(),
        store.add(TaskDraft::new("slow", date(2024, 1, 1))),
        async {
            tokio::time::sleep(DELAY + Duration::from_millis(200)).await;
            store.is_loading()
        }
    );

    load.unwrap();
    add.unwrap();
    assert!(!loading_between);
    assert!(!store.is_loading());
}

#[tokio::test(start_paused = true)]
async fn concurrent_deletes_lose_an_update() {
    let store = make_store(Arc::new(NoFaults));
    let a = store.add(TaskDraft::new("a", date(2024, 1, 1))).await.unwrap();
    let b = store.add(TaskDraft::new("b", date(2024, 1, 2))).await.unwrap();

    let (first, second) = tokio::join!(store.delete(&a.id), store.delete(&b.id));
    first.unwrap();
    second.unwrap();

    // Both read [a, b] before either wrote; the last write wins.
    assert!(store.tasks().is_empty());
    assert_eq!(stored_len(&store).await, 1);
}

#[tokio::test(start_paused = true)]
async fn new_action_clears_error_before_awaiting() {
    let faults = Arc::new(ScriptedFaults::new([true]));
    let store = make_store(faults);
    store.load().await.unwrap_err();
    assert!(store.error().is_some());

    let (result, error_midway) = tokio::join!(store.load(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.error()
    });
    result.unwrap();
    assert_eq!(error_midway, None);
}

// ---------------------------------------------------------------------------
// Session wiring
// ---------------------------------------------------------------------------

#[tokio::test]
async fn file_backed_session_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        data_dir: dir.path().to_path_buf(),
        delay: Duration::ZERO,
        faults_enabled: false,
        ..ClientConfig::default()
    };

    let first = AppContext::start(config.clone()).await;
    let task = first
        .store()
        .add(TaskDraft::new("persist me", date(2024, 5, 5)))
        .await
        .unwrap();
    assert!(dir.path().join("tasks_spa.json").exists());

    let second = AppContext::start(config).await;
    assert_eq!(second.store().tasks(), vec![task]);
}

#[tokio::test]
async fn file_storage_keeps_other_keys_apart() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path());
    storage.set_item("other", "[]".to_string()).await.unwrap();

    let config = ClientConfig {
        data_dir: dir.path().to_path_buf(),
        delay: Duration::ZERO,
        faults_enabled: false,
        ..ClientConfig::default()
    };
    let ctx = AppContext::with_storage(storage, config).await;
    assert!(ctx.store().tasks().is_empty());
    assert_eq!(ctx.store().snapshot(), TaskState::default());
}
