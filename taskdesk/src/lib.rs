//! `taskdesk`: client-side task tracking over a simulated API.
//!
//! [`api::TaskRepository`] is the unreliable backend, [`store::TaskStore`]
//! the reactive state the UI renders from, and [`toast::NotificationService`]
//! carries user feedback for every action.

pub mod api;
pub mod cli;
pub mod config;
pub mod context;
pub mod storage;
pub mod store;
pub mod toast;
