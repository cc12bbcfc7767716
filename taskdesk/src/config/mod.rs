//! Configuration system for the `taskdesk` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskdesk/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::FailureRates;
use crate::api::repository::{DEFAULT_DELAY, DEFAULT_STORAGE_KEY};
use crate::cli::Command;
use crate::toast::DEFAULT_TOAST_LIFETIME;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A failure rate outside `[0.0, 1.0]`.
    #[error("failure rate `{name}` must be between 0 and 1, got {value}")]
    InvalidRate {
        /// Config key of the rate.
        name: &'static str,
        /// Value found in the file.
        value: f64,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageFileConfig,
    api: ApiFileConfig,
    toast: ToastFileConfig,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_dir: Option<PathBuf>,
    key: Option<String>,
}

/// `[api]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiFileConfig {
    delay_ms: Option<u64>,
    seed: Option<u64>,
    faults: Option<bool>,
    fetch_all_failure_rate: Option<f64>,
    create_one_failure_rate: Option<f64>,
    create_many_failure_rate: Option<f64>,
    update_one_failure_rate: Option<f64>,
    delete_one_failure_rate: Option<f64>,
}

/// `[toast]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ToastFileConfig {
    lifetime_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    // -- Storage --
    /// Directory holding one file per storage key.
    pub data_dir: PathBuf,
    /// Storage key of the task collection.
    pub storage_key: String,

    // -- API --
    /// Artificial latency of every repository call.
    pub delay: Duration,
    /// Whether simulated faults are injected at all.
    pub faults_enabled: bool,
    /// Per-operation failure probabilities.
    pub failure_rates: FailureRates,
    /// Fixed seed for the fault generator. `None` seeds from the OS.
    pub seed: Option<u64>,

    // -- Toast --
    /// Lifetime of toasts raised by the store.
    pub toast_lifetime: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().unwrap_or_else(|| PathBuf::from(".taskdesk")),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            delay: DEFAULT_DELAY,
            faults_enabled: true,
            failure_rates: FailureRates::default(),
            seed: None,
            toast_lifetime: DEFAULT_TOAST_LIFETIME,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path
    /// (`~/.config/taskdesk/config.toml`) is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// or if a failure rate is out of range.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve from CLI args and env vars alone, as if no config file
    /// existed. Used when the file is present but unusable.
    #[must_use]
    pub fn from_cli(cli: &CliArgs) -> Self {
        Self::resolve(cli, &ConfigFile::default()).unwrap_or_default()
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let rates = &defaults.failure_rates;

        let failure_rates = FailureRates {
            fetch_all: rate(
                "fetch_all_failure_rate",
                file.api.fetch_all_failure_rate,
                rates.fetch_all,
            )?,
            create_one: rate(
                "create_one_failure_rate",
                file.api.create_one_failure_rate,
                rates.create_one,
            )?,
            create_many: rate(
                "create_many_failure_rate",
                file.api.create_many_failure_rate,
                rates.create_many,
            )?,
            update_one: rate(
                "update_one_failure_rate",
                file.api.update_one_failure_rate,
                rates.update_one,
            )?,
            delete_one: rate(
                "delete_one_failure_rate",
                file.api.delete_one_failure_rate,
                rates.delete_one,
            )?,
        };

        Ok(Self {
            data_dir: cli
                .data_dir
                .clone()
                .or_else(|| file.storage.data_dir.clone())
                .unwrap_or(defaults.data_dir),
            storage_key: file
                .storage
                .key
                .clone()
                .unwrap_or(defaults.storage_key),
            delay: cli
                .delay_ms
                .or(file.api.delay_ms)
                .map_or(defaults.delay, Duration::from_millis),
            faults_enabled: !cli.no_faults && file.api.faults.unwrap_or(defaults.faults_enabled),
            failure_rates,
            seed: cli.seed.or(file.api.seed),
            toast_lifetime: file
                .toast
                .lifetime_ms
                .map_or(defaults.toast_lifetime, Duration::from_millis),
        })
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Task tracker over a simulated, unreliable API")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/taskdesk/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory where task data is stored.
    #[arg(long, global = true, env = "TASKDESK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Simulated network latency in milliseconds.
    #[arg(long, global = true)]
    pub delay_ms: Option<u64>,

    /// Disable simulated faults.
    #[arg(long, global = true)]
    pub no_faults: bool,

    /// Seed for reproducible simulated faults.
    #[arg(long, global = true, env = "TASKDESK_SEED")]
    pub seed: Option<u64>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info", env = "TASKDESK_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskdesk.log`).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Command to run (default: `list`).
    #[command(subcommand)]
    pub command: Option<Command>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn rate(name: &'static str, value: Option<f64>, default: f64) -> Result<f64, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) if (0.0..=1.0).contains(&v) => Ok(v),
        Some(v) => Err(ConfigError::InvalidRate { name, value: v }),
    }
}

/// `~/.local/share/taskdesk` or the platform equivalent.
fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("taskdesk"))
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskdesk").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
