use serde::{Deserialize, Serialize};

/// Main configuration structure for crowdcheck
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Crosscheck thresholds
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Task chooser settings
    #[serde(default)]
    pub chooser: ChooserConfig,

    /// Task types declared in configuration
    #[serde(default)]
    pub task_types: Vec<TaskTypeConfig>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".crowdcheck/crowdcheck.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// `SQLite` connection URL for the configured path.
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite:{}", self.path)
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Log file rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
            retention_days: default_retention_days(),
        }
    }
}

/// Thresholds that drive the verification policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VerificationConfig {
    /// Entries required before reconciliation is attempted
    #[serde(default = "default_min_entries_to_crosscheck")]
    pub min_entries_to_crosscheck: usize,

    /// Entries required before a disagreeing task is flagged for moderation
    #[serde(default = "default_min_entries_to_mark_dirty")]
    pub min_entries_to_mark_dirty: usize,

    /// Confidence needed to auto-verify
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

const fn default_min_entries_to_crosscheck() -> usize {
    3
}

const fn default_min_entries_to_mark_dirty() -> usize {
    4
}

const fn default_min_confidence() -> f64 {
    1.0
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            min_entries_to_crosscheck: default_min_entries_to_crosscheck(),
            min_entries_to_mark_dirty: default_min_entries_to_mark_dirty(),
            min_confidence: default_min_confidence(),
        }
    }
}

/// Task chooser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChooserConfig {
    /// How many of the highest-priority open tasks to pick from at random
    #[serde(default = "default_chooser_window")]
    pub window: usize,
}

const fn default_chooser_window() -> usize {
    20
}

impl Default for ChooserConfig {
    fn default() -> Self {
        Self {
            window: default_chooser_window(),
        }
    }
}

/// A task type declared in configuration instead of code
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskTypeConfig {
    /// Registry name of the task type
    pub name: String,

    /// Expected number of child tasks, used for progress estimates
    #[serde(default)]
    pub average_subtasks_count: f64,

    /// Child task rules applied after verification
    #[serde(default)]
    pub children: Vec<ChildRuleConfig>,

    /// Field paths reconciled with the unanimous rule instead of majority vote
    #[serde(default)]
    pub unanimous_fields: Vec<String>,
}

/// Spawn child tasks from a field of the verified value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChildRuleConfig {
    /// Type of the spawned children
    pub task_type: String,

    /// Dotted path of the field whose elements become child params
    pub from_field: String,
}
