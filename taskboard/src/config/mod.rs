//! Configuration for the `taskboard` CLI.
//!
//! Layered with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskboard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};

use crate::board::{BoardSettings, FailurePolicy, GroupingKey, LabelPolicy};

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

    /// A setting has a value outside its domain.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Setting name.
        key: &'static str,
        /// What was wrong.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    board: BoardFileConfig,
    labels: LabelsFileConfig,
    storage: StorageFileConfig,
}

/// `[board]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BoardFileConfig {
    grouping: Option<String>,
    event_buffer: Option<usize>,
    on_update_failure: Option<String>,
}

/// `[labels]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct LabelsFileConfig {
    unknown_priority: Option<String>,
    unknown_status: Option<String>,
    missing_category: Option<String>,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_file: Option<PathBuf>,
    projects_file: Option<PathBuf>,
    layout_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Engine settings.
    pub board: BoardSettings,
    /// Initial title filter.
    pub filter: String,
    /// JSON file holding the task documents.
    pub data_file: PathBuf,
    /// JSON file holding the project documents.
    pub projects_file: PathBuf,
    /// Base path of the postcard layout files, one per grouping key.
    pub layout_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("taskboard");
        Self {
            board: BoardSettings::default(),
            filter: String::new(),
            data_file: data_dir.join("tasks.json"),
            projects_file: data_dir.join("projects.json"),
            layout_file: data_dir.join("layout.bin"),
        }
    }
}

impl AppConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// any config file cannot be parsed, or a value is invalid.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let grouping = match cli.grouping.as_deref().or(file.board.grouping.as_deref()) {
            Some(raw) => raw
                .parse::<GroupingKey>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "grouping",
                    message: e.to_string(),
                })?,
            None => defaults.board.grouping,
        };
        let on_update_failure = match file.board.on_update_failure.as_deref() {
            Some(raw) => raw
                .parse::<FailurePolicy>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "board.on_update_failure",
                    message: e.to_string(),
                })?,
            None => defaults.board.on_update_failure,
        };
        let event_buffer = file
            .board
            .event_buffer
            .unwrap_or(defaults.board.event_buffer);
        if event_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "board.event_buffer",
                message: "must be at least 1".to_string(),
            });
        }

        let default_labels = LabelPolicy::default();
        let labels = LabelPolicy {
            unknown_priority: non_blank(
                "labels.unknown_priority",
                file.labels.unknown_priority.as_deref(),
            )?
            .unwrap_or(default_labels.unknown_priority),
            unknown_status: non_blank(
                "labels.unknown_status",
                file.labels.unknown_status.as_deref(),
            )?
            .unwrap_or(default_labels.unknown_status),
            missing_category: non_blank(
                "labels.missing_category",
                file.labels.missing_category.as_deref(),
            )?
            .unwrap_or(default_labels.missing_category),
        };

        Ok(Self {
            board: BoardSettings {
                grouping,
                labels,
                on_update_failure,
                event_buffer,
            },
            filter: cli.filter.clone().unwrap_or_default(),
            data_file: cli
                .data
                .clone()
                .or_else(|| file.storage.data_file.clone())
                .unwrap_or(defaults.data_file),
            projects_file: file
                .storage
                .projects_file
                .clone()
                .unwrap_or(defaults.projects_file),
            layout_file: file
                .storage
                .layout_file
                .clone()
                .unwrap_or(defaults.layout_file),
        })
    }
}

fn non_blank(key: &'static str, value: Option<&str>) -> Result<Option<String>, ConfigError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ConfigError::InvalidValue {
            key,
            message: "must not be blank".to_string(),
        }),
        other => Ok(other.map(ToString::to_string)),
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Grouped task board")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/taskboard/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the task data file.
    #[arg(long, env = "TASKBOARD_DATA")]
    pub data: Option<PathBuf>,

    /// Grouping key: category, priority or status.
    #[arg(short, long, env = "TASKBOARD_GROUPING")]
    pub grouping: Option<String>,

    /// Only show tasks whose title contains this text.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKBOARD_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskboard.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Command to run (default: show).
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Board commands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the board.
    Show,
    /// Create a task.
    Add {
        /// Task title (2-50 characters).
        title: String,
        /// LOW, MEDIUM or HIGH.
        #[arg(short, long)]
        priority: Option<String>,
        /// TODO, IN_PROGRESS or DONE.
        #[arg(short, long)]
        status: Option<String>,
        /// Free-form category.
        #[arg(short, long)]
        category: Option<String>,
        /// Longer description.
        #[arg(short, long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD).
        #[arg(long)]
        deadline: Option<chrono::NaiveDate>,
        /// Owning project id.
        #[arg(long)]
        project: Option<String>,
    },
    /// Drag a card into a column.
    Move {
        /// Task id.
        task: String,
        /// Destination column label.
        column: String,
        /// Drop onto this card instead of the end of the column.
        #[arg(long)]
        before: Option<String>,
    },
    /// Drag a column onto another column.
    Reorder {
        /// Column to move.
        column: String,
        /// Column whose place it takes.
        over: String,
    },
    /// Delete a task.
    Delete {
        /// Task id.
        task: String,
    },
    /// Delete every completed task.
    DeleteCompleted,
    /// List the categories in use.
    Categories,
    /// Manage projects (default: list).
    Projects {
        /// Project action.
        #[command(subcommand)]
        action: Option<ProjectCommand>,
    },
}

/// Project commands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ProjectCommand {
    /// List projects with their task counts.
    List,
    /// Create a project.
    Add {
        /// Project name (1-50 characters).
        name: String,
        /// TODO, IN_PROGRESS or DONE.
        #[arg(short, long)]
        status: Option<String>,
        /// Longer description.
        #[arg(short, long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD).
        #[arg(long)]
        deadline: Option<chrono::NaiveDate>,
        /// Task id to attach; repeatable.
        #[arg(long = "task")]
        tasks: Vec<String>,
    },
    /// Delete a project and detach its tasks.
    Delete {
        /// Project id.
        project: String,
    },
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
        config_dir.join("taskboard").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
