//! Transient user notifications ("toasts").
//!
//! [`NotificationService`] owns a queue of [`Toast`]s. A toast with a
//! non-zero lifetime gets a timer task that removes it when the lifetime
//! elapses; dismissing it first aborts that task, so a timer never fires
//! against an entry that is already gone. The queue is published through a
//! [`tokio::sync::watch`] channel for the UI to render.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Lifetime applied when none is given.
pub const DEFAULT_TOAST_LIFETIME: Duration = Duration::from_millis(3000);

/// Unique toast identifier, `toast-<uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ToastId(String);

impl ToastId {
    fn new() -> Self {
        Self(format!("toast-{}", Uuid::now_v7()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a toast is styled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Neutral information.
    #[default]
    Info,
    /// An action completed.
    Success,
    /// Something needs attention.
    Warning,
    /// An action failed.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A notification as the UI sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    /// Unique identifier.
    pub id: ToastId,
    /// Text shown to the user.
    pub message: String,
    /// Styling.
    pub severity: Severity,
    /// Requested lifetime; zero keeps the toast until dismissed.
    pub lifetime: Duration,
    /// Whether the UI offers a close control.
    pub dismissible: bool,
}

/// Optional parameters of [`NotificationService::notify_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToastOptions {
    /// Styling.
    pub severity: Severity,
    /// Lifetime; zero means no auto-dismiss.
    pub lifetime: Duration,
    /// Whether the UI offers a close control.
    pub dismissible: bool,
}

impl Default for ToastOptions {
    fn default() -> Self {
        Self {
            severity: Severity::Info,
            lifetime: DEFAULT_TOAST_LIFETIME,
            dismissible: true,
        }
    }
}

struct Entry {
    toast: Toast,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    entries: Mutex<Vec<Entry>>,
    published: watch::Sender<Vec<Toast>>,
    default_lifetime: Duration,
}

impl Inner {
    /// Republishes the queue. Called with `entries` locked so snapshots are
    /// published in mutation order.
    fn publish(&self, entries: &[Entry]) {
        self.published
            .send_replace(entries.iter().map(|e| e.toast.clone()).collect());
    }

    /// Removes the entry with `id`, returning it if it was present.
    fn take(&self, id: &ToastId) -> Option<Entry> {
        let mut entries = self.entries.lock();
        let index = entries.iter().position(|e| e.toast.id == *id)?;
        let entry = entries.remove(index);
        self.publish(&entries);
        Some(entry)
    }
}

/// Queue of toasts for one UI session.
///
/// Cloning is cheap and yields a handle to the same queue.
#[derive(Clone)]
pub struct NotificationService {
    inner: Arc<Inner>,
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationService")
            .field("toasts", &self.len())
            .field("default_lifetime", &self.inner.default_lifetime)
            .finish()
    }
}

impl NotificationService {
    /// Creates an empty queue with the default 3 s lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self::with_default_lifetime(DEFAULT_TOAST_LIFETIME)
    }

    /// Creates an empty queue whose convenience creators use `lifetime`.
    #[must_use]
    pub fn with_default_lifetime(lifetime: Duration) -> Self {
        let (published, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(Vec::new()),
                published,
                default_lifetime: lifetime,
            }),
        }
    }

    /// Shows an info toast with the default lifetime.
    pub fn notify(&self, message: impl Into<String>) -> ToastId {
        self.notify_severity(message, Severity::Info)
    }

    /// Shows a success toast with the default lifetime.
    pub fn success(&self, message: impl Into<String>) -> ToastId {
        self.notify_severity(message, Severity::Success)
    }

    /// Shows an error toast with the default lifetime.
    pub fn error(&self, message: impl Into<String>) -> ToastId {
        self.notify_severity(message, Severity::Error)
    }

    /// Shows an info toast with the default lifetime.
    pub fn info(&self, message: impl Into<String>) -> ToastId {
        self.notify_severity(message, Severity::Info)
    }

    /// Shows a warning toast with the default lifetime.
    pub fn warning(&self, message: impl Into<String>) -> ToastId {
        self.notify_severity(message, Severity::Warning)
    }

    /// Shows a success toast with its own lifetime and close control.
    pub fn success_with(
        &self,
        message: impl Into<String>,
        lifetime: Duration,
        dismissible: bool,
    ) -> ToastId {
        self.notify_severity_with(message, Severity::Success, lifetime, dismissible)
    }

    /// Shows an error toast with its own lifetime and close control.
    pub fn error_with(
        &self,
        message: impl Into<String>,
        lifetime: Duration,
        dismissible: bool,
    ) -> ToastId {
        self.notify_severity_with(message, Severity::Error, lifetime, dismissible)
    }

    /// Shows an info toast with its own lifetime and close control.
    pub fn info_with(
        &self,
        message: impl Into<String>,
        lifetime: Duration,
        dismissible: bool,
    ) -> ToastId {
        self.notify_severity_with(message, Severity::Info, lifetime, dismissible)
    }

    /// Shows a warning toast with its own lifetime and close control.
    pub fn warning_with(
        &self,
        message: impl Into<String>,
        lifetime: Duration,
        dismissible: bool,
    ) -> ToastId {
        self.notify_severity_with(message, Severity::Warning, lifetime, dismissible)
    }

    fn notify_severity(&self, message: impl Into<String>, severity: Severity) -> ToastId {
        self.notify_severity_with(message, severity, self.inner.default_lifetime, true)
    }

    fn notify_severity_with(
        &self,
        message: impl Into<String>,
        severity: Severity,
        lifetime: Duration,
        dismissible: bool,
    ) -> ToastId {
        self.notify_with(
            message,
            ToastOptions {
                severity,
                lifetime,
                dismissible,
            },
        )
    }

    /// Appends a toast and, for a non-zero lifetime, schedules its removal.
    ///
    /// Scheduling needs a running tokio runtime; without one the toast is
    /// kept until dismissed.
    pub fn notify_with(&self, message: impl Into<String>, options: ToastOptions) -> ToastId {
        let toast = Toast {
            id: ToastId::new(),
            message: message.into(),
            severity: options.severity,
            lifetime: options.lifetime,
            dismissible: options.dismissible,
        };
        let id = toast.id.clone();

        let mut entries = self.inner.entries.lock();
        let timer = if options.lifetime.is_zero() {
            None
        } else {
            self.schedule_expiry(id.clone(), options.lifetime)
        };
        tracing::debug!(toast_id = %id, severity = %toast.severity, "toast shown");
        entries.push(Entry { toast, timer });
        self.inner.publish(&entries);
        drop(entries);

        id
    }

    fn schedule_expiry(&self, id: ToastId, lifetime: Duration) -> Option<JoinHandle<()>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(toast_id = %id, "no async runtime, toast will not auto-dismiss");
            return None;
        };
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Some(runtime.spawn(async move {
            tokio::time::sleep(lifetime).await;
            if let Some(inner) = inner.upgrade()
                && inner.take(&id).is_some()
            {
                tracing::debug!(toast_id = %id, "toast expired");
            }
        }))
    }

    /// Removes a toast and cancels its timer.
    ///
    /// Returns `false` if no toast has `id`; dismissing twice is harmless.
    pub fn dismiss(&self, id: &ToastId) -> bool {
        let Some(entry) = self.inner.take(id) else {
            return false;
        };
        if let Some(timer) = entry.timer {
            timer.abort();
        }
        tracing::debug!(toast_id = %id, "toast dismissed");
        true
    }

    /// Dismisses every toast, cancelling all timers.
    pub fn clear(&self) {
        let mut entries = self.inner.entries.lock();
        for entry in entries.drain(..) {
            if let Some(timer) = entry.timer {
                timer.abort();
            }
        }
        self.inner.publish(&entries);
    }

    /// Current queue, oldest first.
    #[must_use]
    pub fn toasts(&self) -> Vec<Toast> {
        self.inner.published.borrow().clone()
    }

    /// Number of queued toasts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Returns `true` if no toast is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of queued toasts whose auto-dismiss timer is still pending.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.inner
            .entries
            .lock()
            .iter()
            .filter(|e| e.timer.as_ref().is_some_and(|t| !t.is_finished()))
            .count()
    }

    /// Subscribes to queue changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Toast>> {
        self.inner.published.subscribe()
    }
}
