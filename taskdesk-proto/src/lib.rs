//! Shared data model and storage format for `Taskdesk`.

pub mod codec;
pub mod query;
pub mod task;
