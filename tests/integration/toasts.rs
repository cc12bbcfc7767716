//! Integration tests for toast lifetimes and dismissal.
//!
//! All tests run on a paused clock so timer expiry is deterministic.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use taskdesk::api::{FailOn, NoFaults, Operation, TaskRepository};
use taskdesk::storage::MemoryStorage;
use taskdesk::store::TaskStore;
use taskdesk::toast::{NotificationService, Severity, ToastOptions};
use taskdesk_proto::task::TaskDraft;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn messages(service: &NotificationService) -> Vec<String> {
    service.toasts().into_iter().map(|t| t.message).collect()
}

// ---------------------------------------------------------------------------
// Lifetimes
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn toasts_expire_independently() {
    let service = NotificationService::new();
    service.notify_with(
        "short",
        ToastOptions {
            lifetime: ms(1000),
            ..ToastOptions::default()
        },
    );
    service.notify("default");
    service.notify_with(
        "sticky",
        ToastOptions {
            lifetime: Duration::ZERO,
            severity: Severity::Warning,
            dismissible: false,
        },
    );

    tokio::time::sleep(ms(1001)).await;
    assert_eq!(messages(&service), vec!["default", "sticky"]);

    tokio::time::sleep(ms(2000)).await;
    assert_eq!(messages(&service), vec!["sticky"]);

    tokio::time::sleep(ms(60_000)).await;
    assert_eq!(messages(&service), vec!["sticky"]);
    assert_eq!(service.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn configured_default_lifetime_applies_to_helpers() {
    let service = NotificationService::with_default_lifetime(ms(200));
    service.success("done");
    service.error("failed");
    tokio::time::sleep(ms(201)).await;
    assert!(service.is_empty());
}

#[tokio::test(start_paused = true)]
async fn severity_helpers_take_per_call_options() {
    let service = NotificationService::with_default_lifetime(ms(200));
    service.success_with("saved", ms(500), true);
    service.error_with("offline", Duration::ZERO, false);
    service.info_with("syncing", ms(1000), false);
    service.warning_with("slow", ms(100), true);

    let toasts = service.toasts();
    let shape: Vec<_> = toasts
        .iter()
        .map(|t| (t.severity, t.dismissible))
        .collect();
    assert_eq!(
        shape,
        vec![
            (Severity::Success, true),
            (Severity::Error, false),
            (Severity::Info, false),
            (Severity::Warning, true),
        ]
    );

    // The per-call lifetime wins over the service default.
    tokio::time::sleep(ms(201)).await;
    assert_eq!(messages(&service), vec!["saved", "offline", "syncing"]);
    tokio::time::sleep(ms(300)).await;
    assert_eq!(messages(&service), vec!["offline", "syncing"]);
    tokio::time::sleep(ms(500)).await;
    assert_eq!(messages(&service), vec!["offline"]);
    assert_eq!(service.pending_timers(), 0);
}

// ---------------------------------------------------------------------------
// Dismissal
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn dismissed_toast_timer_never_fires_on_newer_toast() {
    let service = NotificationService::new();
    let first = service.notify("first");
    tokio::time::sleep(ms(1000)).await;
    assert!(service.dismiss(&first));

    let second = service.notify("second");
    // The first toast's original deadline passes.
    tokio::time::sleep(ms(2500)).await;
    assert_eq!(messages(&service), vec!["second"]);

    tokio::time::sleep(ms(600)).await;
    assert!(service.is_empty());
    assert!(!service.dismiss(&second));
}

#[tokio::test(start_paused = true)]
async fn non_dismissible_toast_can_still_be_dismissed_programmatically() {
    let service = NotificationService::new();
    let id = service.notify_with(
        "blocking",
        ToastOptions {
            dismissible: false,
            ..ToastOptions::default()
        },
    );
    assert!(!service.toasts()[0].dismissible);
    assert!(service.dismiss(&id));
    assert!(service.is_empty());
}

#[tokio::test(start_paused = true)]
async fn subscriber_sees_expiry() {
    let service = NotificationService::new();
    let mut rx = service.subscribe();
    service.info("watch me");
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().len(), 1);

    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().is_empty());
}

// ---------------------------------------------------------------------------
// Store toasts
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn store_error_toast_expires_after_three_seconds() {
    let repo = TaskRepository::new(
        MemoryStorage::new(),
        Arc::new(FailOn::new([Operation::FetchAll])),
    )
    .with_delay(ms(500));
    let store = TaskStore::new(Arc::new(repo), NotificationService::new());

    store.load().await.unwrap_err();
    let toasts = store.notifications().toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].severity, Severity::Error);

    tokio::time::sleep(ms(2999)).await;
    assert_eq!(store.notifications().len(), 1);
    tokio::time::sleep(ms(2)).await;
    assert!(store.notifications().is_empty());
    // The error itself stays until the next action.
    assert!(store.error().is_some());
}

#[tokio::test(start_paused = true)]
async fn mutations_toast_once_and_load_stays_silent() {
    let repo = TaskRepository::new(MemoryStorage::new(), Arc::new(NoFaults)).with_delay(ms(500));
    let store = TaskStore::new(
        Arc::new(repo),
        NotificationService::with_default_lifetime(Duration::ZERO),
    );
    let due = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let task = store.add(TaskDraft::new("a", due)).await.unwrap();
    store.import_many(vec![TaskDraft::new("b", due)]).await.unwrap();
    store.update(task.clone()).await.unwrap();
    store.delete(&task.id).await.unwrap();

    let after_mutations = vec![
        "Task created successfully.",
        "1 task(s) imported successfully.",
        "Task updated successfully.",
        "Task deleted successfully.",
    ];
    assert_eq!(messages(store.notifications()), after_mutations);

    store.load().await.unwrap();
    assert_eq!(messages(store.notifications()), after_mutations);
}
