//! Simulated task API.
//!
//! [`TaskRepository`] plays the role of a remote backend: every call waits
//! out an artificial network delay, may fail at random according to a
//! [`FaultInjector`], and otherwise reads or rewrites the whole task
//! collection in local storage.
//!
//! Modeled failures (simulated faults, missing tasks, malformed data) are
//! returned as [`ApiError`] values; nothing in this module panics.

pub mod faults;
pub mod repository;

use std::fmt;

use serde::Serialize;
use taskdesk_proto::codec::CodecError;
use taskdesk_proto::task::TaskId;

use crate::storage::StorageError;

pub use faults::{FailOn, FailureRates, FaultInjector, NoFaults, RandomFaults, ScriptedFaults};
pub use repository::TaskRepository;

/// Result of a repository call.
pub type ApiResult<T> = Result<T, ApiError>;

/// Flattened view of an [`ApiResult`]: a success flag, the payload when
/// successful and the message when not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub success: bool,
    /// Payload, present only on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// User-facing message, present only on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> From<ApiResult<T>> for ApiResponse<T> {
    fn from(result: ApiResult<T>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(err) => Self {
                success: false,
                data: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// The five operations of the simulated API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Read the whole collection.
    FetchAll,
    /// Append one task.
    CreateOne,
    /// Append several tasks in one write.
    CreateMany,
    /// Replace one task by id.
    UpdateOne,
    /// Remove one task by id.
    DeleteOne,
}

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::FetchAll,
        Self::CreateOne,
        Self::CreateMany,
        Self::UpdateOne,
        Self::DeleteOne,
    ];

    /// Probability that a single call fails with a simulated fault,
    /// not counting the nested fetch of mutating calls.
    #[must_use]
    pub const fn default_failure_rate(self) -> f64 {
        match self {
            Self::FetchAll => 0.20,
            Self::CreateOne => 0.15,
            Self::CreateMany | Self::UpdateOne => 0.10,
            Self::DeleteOne => 0.05,
        }
    }

    /// Returns `true` for operations that rewrite the collection.
    ///
    /// Mutating operations re-fetch the collection first, so they are also
    /// exposed to [`Operation::FetchAll`]'s fault.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Self::FetchAll)
    }

    /// User-facing message for a simulated fault of this operation.
    #[must_use]
    pub const fn simulated_failure_message(self) -> &'static str {
        match self {
            Self::FetchAll => "Simulated network error while fetching tasks.",
            Self::CreateOne => "Simulated error while creating the task.",
            Self::CreateMany => "Simulated error while importing tasks.",
            Self::UpdateOne => "Simulated error while updating the task.",
            Self::DeleteOne => "Simulated error while deleting the task.",
        }
    }

    /// User-facing message when the target task does not exist.
    #[must_use]
    pub const fn not_found_message(self) -> &'static str {
        match self {
            Self::DeleteOne => "Task not found for deletion.",
            _ => "Task not found for update.",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchAll => write!(f, "fetch_all"),
            Self::CreateOne => write!(f, "create_one"),
            Self::CreateMany => write!(f, "create_many"),
            Self::UpdateOne => write!(f, "update_one"),
            Self::DeleteOne => write!(f, "delete_one"),
        }
    }
}

/// Failure of a repository call.
///
/// The first three variants are the modeled outcomes of the simulated
/// backend. [`ApiError::Storage`] is anything the model does not cover
/// (I/O errors, quota exhaustion).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Injected transient fault.
    #[error("{}", .0.simulated_failure_message())]
    Simulated(Operation),

    /// Update or delete target is not in the collection.
    #[error("{}", .operation.not_found_message())]
    NotFound {
        /// Operation that looked the task up.
        operation: Operation,
        /// Identifier that was not found.
        id: TaskId,
    },

    /// Stored collection could not be decoded.
    #[error("Internal error while processing task data.")]
    Malformed(#[from] CodecError),

    /// Storage backend failed outside the fault model.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}
