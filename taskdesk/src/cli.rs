//! Command-line front end over [`TaskStore`].
//!
//! Each subcommand runs exactly one store action (plus the initial load
//! done when the session starts) and renders the result as plain lines.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};

use taskdesk_proto::codec::{self, CodecError};
use taskdesk_proto::query::{SortKey, SortOrder, TaskQuery};
use taskdesk_proto::task::{Task, TaskDraft, TaskId, TaskPriority, TaskStatus};

use crate::storage::KeyValueStorage;
use crate::store::{ActionError, TaskStore};
use crate::toast::Toast;

/// Subcommands of the `taskdesk` binary.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List tasks, optionally filtered and sorted.
    List {
        /// Only tasks with this status.
        #[arg(long)]
        status: Option<StatusArg>,
        /// Only tasks with this priority.
        #[arg(long)]
        priority: Option<PriorityArg>,
        /// Case-insensitive text to look for in title or description.
        #[arg(long)]
        search: Option<String>,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortArg::Insertion)]
        sort: SortArg,
        /// Sort in descending order.
        #[arg(long)]
        desc: bool,
    },
    /// Show one task.
    Show {
        /// Task identifier.
        id: String,
    },
    /// Create a task.
    Add {
        /// Short summary.
        #[arg(long)]
        title: String,
        /// Due date (YYYY-MM-DD).
        #[arg(long)]
        due: NaiveDate,
        /// Longer free-form text.
        #[arg(long)]
        description: Option<String>,
        /// Initial status.
        #[arg(long, value_enum, default_value_t = StatusArg::Pending)]
        status: StatusArg,
        /// Priority.
        #[arg(long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
    },
    /// Import tasks from a JSON array of drafts.
    Import {
        /// File to read.
        file: PathBuf,
    },
    /// Change fields of an existing task.
    Update {
        /// Task identifier.
        id: String,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New due date (YYYY-MM-DD).
        #[arg(long)]
        due: Option<NaiveDate>,
        /// New description.
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the description.
        #[arg(long)]
        clear_description: bool,
        /// New status.
        #[arg(long)]
        status: Option<StatusArg>,
        /// New priority.
        #[arg(long)]
        priority: Option<PriorityArg>,
    },
    /// Delete a task.
    Delete {
        /// Task identifier.
        id: String,
    },
}

impl Default for Command {
    fn default() -> Self {
        Self::List {
            status: None,
            priority: None,
            search: None,
            sort: SortArg::Insertion,
            desc: false,
        }
    }
}

/// `--status` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Not started.
    Pending,
    /// Being worked on.
    InProgress,
    /// Done.
    Completed,
}

impl From<StatusArg> for TaskStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => Self::Pending,
            StatusArg::InProgress => Self::InProgress,
            StatusArg::Completed => Self::Completed,
        }
    }
}

/// `--priority` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    /// Can wait.
    Low,
    /// Normal.
    Medium,
    /// Soon.
    High,
    /// Now.
    Urgent,
}

impl From<PriorityArg> for TaskPriority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
            PriorityArg::Urgent => Self::Urgent,
        }
    }
}

/// `--sort` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    /// Storage order.
    Insertion,
    /// Due date.
    Due,
    /// Priority.
    Priority,
    /// Title.
    Title,
    /// Status.
    Status,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Insertion => Self::Insertion,
            SortArg::Due => Self::DueDate,
            SortArg::Priority => Self::Priority,
            SortArg::Title => Self::Title,
            SortArg::Status => Self::Status,
        }
    }
}

/// Failure of a CLI command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The store action failed. Its toast has already been raised.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// No cached task has the given id.
    #[error("no task with id {0}")]
    UnknownTask(TaskId),

    /// The import file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadImport {
        /// File that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The import file is not a JSON array of drafts.
    #[error("invalid import file: {0}")]
    ParseImport(#[from] CodecError),
}

/// Runs `command` against `store` and returns the lines to print.
///
/// # Errors
///
/// Returns [`CommandError`] if the store action fails or the command's
/// input cannot be resolved.
pub async fn execute<S: KeyValueStorage>(
    store: &TaskStore<S>,
    command: Command,
) -> Result<Vec<String>, CommandError> {
    match command {
        Command::List {
            status,
            priority,
            search,
            sort,
            desc,
        } => {
            let query = TaskQuery {
                status: status.map(Into::into),
                priority: priority.map(Into::into),
                text: search,
                sort: sort.into(),
                order: if desc {
                    SortOrder::Descending
                } else {
                    SortOrder::Ascending
                },
            };
            let tasks = store.query(&query);
            if tasks.is_empty() {
                return Ok(vec!["No tasks.".to_string()]);
            }
            Ok(tasks.iter().map(summary_line).collect())
        }
        Command::Show { id } => {
            let task = cached(store, id)?;
            Ok(detail_lines(&task))
        }
        Command::Add {
            title,
            due,
            description,
            status,
            priority,
        } => {
            let mut draft = TaskDraft::new(title, due)
                .with_status(status.into())
                .with_priority(priority.into());
            if let Some(description) = description {
                draft = draft.with_description(description);
            }
            let task = store.add(draft).await?;
            Ok(vec![summary_line(&task)])
        }
        Command::Import { file } => {
            let drafts = read_drafts(&file).await?;
            let created = store.import_many(drafts).await?;
            Ok(created.iter().map(summary_line).collect())
        }
        Command::Update {
            id,
            title,
            due,
            description,
            clear_description,
            status,
            priority,
        } => {
            let mut task = cached(store, id)?;
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(due) = due {
                task.due_date = due;
            }
            if clear_description {
                task.description = None;
            } else if description.is_some() {
                task.description = description;
            }
            if let Some(status) = status {
                task.status = status.into();
            }
            if let Some(priority) = priority {
                task.priority = priority.into();
            }
            let task = store.update(task).await?;
            Ok(vec![summary_line(&task)])
        }
        Command::Delete { id } => {
            let deleted = store.delete(&TaskId::from_string(id)).await?;
            Ok(vec![format!("deleted {deleted}")])
        }
    }
}

/// Renders a toast as one line.
#[must_use]
pub fn toast_line(toast: &Toast) -> String {
    format!("[{}] {}", toast.severity, toast.message)
}

fn cached<S: KeyValueStorage>(store: &TaskStore<S>, id: String) -> Result<Task, CommandError> {
    let id = TaskId::from_string(id);
    store
        .task_by_id(&id)
        .ok_or(CommandError::UnknownTask(id))
}

async fn read_drafts(path: &Path) -> Result<Vec<TaskDraft>, CommandError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::ReadImport {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(codec::decode_drafts(&json)?)
}

fn summary_line(task: &Task) -> String {
    format!(
        "{}  {}  {:<10}  {:<6}  {}",
        task.id,
        task.due_date,
        task.status.to_string(),
        task.priority.to_string(),
        task.title
    )
}

fn detail_lines(task: &Task) -> Vec<String> {
    let mut lines = vec![
        format!("id:          {}", task.id),
        format!("title:       {}", task.title),
        format!("due:         {}", task.due_date),
        format!("status:      {}", task.status),
        format!("priority:    {}", task.priority),
    ];
    if let Some(description) = &task.description {
        lines.push(format!("description: {description}"));
    }
    lines
}
