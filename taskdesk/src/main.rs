//! `taskdesk`: track tasks against a simulated, unreliable backend.
//!
//! Every command starts a session (which loads the task collection), runs
//! one store action and prints the result followed by any toasts raised.
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskdesk/config.toml`).
//!
//! ```bash
//! cargo run --bin taskdesk -- add --title "Buy milk" --due 2024-06-01
//! cargo run --bin taskdesk -- list --sort due
//!
//! # Reproducible faults, no latency
//! TASKDESK_SEED=7 cargo run --bin taskdesk -- --delay-ms 0 list
//! ```

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskdesk::cli::{self, CommandError};
use taskdesk::config::{CliArgs, ClientConfig};
use taskdesk::context::AppContext;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    // CLI args > env > config file > defaults.
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::from_cli(&cli)
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("taskdesk starting");

    let ctx = AppContext::start(config).await;
    let command = cli.command.unwrap_or_default();
    let result = cli::execute(ctx.store(), command).await;

    let code = match result {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        // Already reported through a toast.
        Err(CommandError::Action(_)) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    };

    for toast in ctx.notifications().toasts() {
        eprintln!("{}", cli::toast_line(&toast));
    }

    tracing::info!("taskdesk exiting");
    code
}

/// Initialize file-based logging.
///
/// Logs go to a file so they never interleave with command output. Returns
/// a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskdesk.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
