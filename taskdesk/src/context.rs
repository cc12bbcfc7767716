//! Application wiring: one storage, repository, notification service and
//! store per session.

use std::sync::Arc;

use crate::api::{FaultInjector, NoFaults, RandomFaults, TaskRepository};
use crate::config::ClientConfig;
use crate::storage::{FileStorage, KeyValueStorage};
use crate::store::TaskStore;
use crate::toast::NotificationService;

/// A running session.
pub struct AppContext<S: KeyValueStorage> {
    config: ClientConfig,
    store: TaskStore<S>,
}

impl AppContext<FileStorage> {
    /// Starts a session over the configured data directory.
    pub async fn start(config: ClientConfig) -> Self {
        let storage = FileStorage::new(config.data_dir.clone());
        Self::with_storage(storage, config).await
    }
}

impl<S: KeyValueStorage> AppContext<S> {
    /// Starts a session over `storage` and loads the task collection.
    ///
    /// A failed initial load is not fatal: it is recorded in the store's
    /// error and toasts like any other failed action.
    pub async fn with_storage(storage: S, config: ClientConfig) -> Self {
        let faults: Arc<dyn FaultInjector> = if !config.faults_enabled {
            Arc::new(NoFaults)
        } else if let Some(seed) = config.seed {
            Arc::new(RandomFaults::seeded(config.failure_rates, seed))
        } else {
            Arc::new(RandomFaults::new(config.failure_rates))
        };

        let repository = TaskRepository::new(storage, faults)
            .with_delay(config.delay)
            .with_key(config.storage_key.clone());
        let notifications = NotificationService::with_default_lifetime(config.toast_lifetime);
        let store = TaskStore::new(Arc::new(repository), notifications);

        tracing::info!(
            key = %config.storage_key,
            faults = config.faults_enabled,
            delay_ms = config.delay.as_millis(),
            "session starting"
        );
        if let Err(err) = store.load().await {
            tracing::warn!(error = %err, "initial load failed");
        }

        Self { config, store }
    }

    /// The task store.
    pub const fn store(&self) -> &TaskStore<S> {
        &self.store
    }

    /// The notification service the store raises toasts on.
    pub const fn notifications(&self) -> &NotificationService {
        self.store.notifications()
    }

    /// The configuration this session was started with.
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Clears store state and all toasts. Stored tasks are kept.
    pub fn reset(&self) {
        self.store.reset();
        self.store.notifications().clear();
    }
}
