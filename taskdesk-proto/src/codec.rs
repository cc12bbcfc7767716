//! JSON storage format for task collections.
//!
//! The whole collection is one JSON array under a single storage key.
//! There is no schema version; anything that fails to parse is reported
//! as [`CodecError::Malformed`] instead of panicking.

use crate::task::{Task, TaskDraft};

/// Error type for collection encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Stored or imported data is not a valid task array.
    #[error("malformed task data: {0}")]
    Malformed(String),
}

/// Encodes a task collection as a JSON array, preserving order.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the collection cannot be serialized.
pub fn encode_tasks(tasks: &[Task]) -> Result<String, CodecError> {
    serde_json::to_string(tasks).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a task collection from its stored JSON form.
///
/// # Errors
///
/// Returns `CodecError::Malformed` if the input is not a JSON array of tasks.
pub fn decode_tasks(json: &str) -> Result<Vec<Task>, CodecError> {
    serde_json::from_str(json).map_err(|e| CodecError::Malformed(e.to_string()))
}

/// Decodes an import file: a JSON array of tasks without identifiers.
///
/// Any `id` fields present in the file are ignored; imported tasks always
/// get fresh identifiers.
///
/// # Errors
///
/// Returns `CodecError::Malformed` if the input is not a JSON array of drafts.
pub fn decode_drafts(json: &str) -> Result<Vec<TaskDraft>, CodecError> {
    serde_json::from_str(json).map_err(|e| CodecError::Malformed(e.to_string()))
}
