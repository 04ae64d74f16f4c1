use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Directory holding project-local configuration and data.
pub const CONFIG_DIR: &str = ".crowdcheck";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid min_entries_to_crosscheck: {0}. Must be at least 1")]
    InvalidCrosscheckMinimum(usize),

    #[error(
        "Invalid min_entries_to_mark_dirty: {dirty}. Must be greater than min_entries_to_crosscheck ({crosscheck})"
    )]
    InvalidDirtyThreshold { dirty: usize, crosscheck: usize },

    #[error("Invalid min_confidence: {0}. Must be in (0, 1]")]
    InvalidMinConfidence(f64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid chooser window: {0}. Must be at least 1")]
    InvalidChooserWindow(usize),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .crowdcheck/config.yaml (project config, created by init)
    /// 3. .crowdcheck/local.yaml (project local overrides, optional)
    /// 4. Environment variables (CROWDCHECK_* prefix, `__` between sections)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(CONFIG_DIR)
    }

    /// Same hierarchy as [`ConfigLoader::load`] rooted at `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed("CROWDCHECK_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let verification = &config.verification;
        if verification.min_entries_to_crosscheck == 0 {
            return Err(ConfigError::InvalidCrosscheckMinimum(
                verification.min_entries_to_crosscheck,
            ));
        }
        if verification.min_entries_to_mark_dirty <= verification.min_entries_to_crosscheck {
            return Err(ConfigError::InvalidDirtyThreshold {
                dirty: verification.min_entries_to_mark_dirty,
                crosscheck: verification.min_entries_to_crosscheck,
            });
        }
        if !(verification.min_confidence > 0.0 && verification.min_confidence <= 1.0) {
            return Err(ConfigError::InvalidMinConfidence(verification.min_confidence));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        if config.chooser.window == 0 {
            return Err(ConfigError::InvalidChooserWindow(config.chooser.window));
        }

        let mut names = HashSet::new();
        for task_type in &config.task_types {
            if task_type.name.is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "task type name cannot be empty".to_string(),
                ));
            }
            if !names.insert(task_type.name.as_str()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "task type '{}' is declared more than once",
                    task_type.name
                )));
            }
            if task_type.average_subtasks_count < 0.0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "task type '{}' has a negative average_subtasks_count",
                    task_type.name
                )));
            }
            if let Some(rule) = task_type.children.iter().find(|r| r.from_field.is_empty()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "task type '{}' has a child rule for '{}' without from_field",
                    task_type.name, rule.task_type
                )));
            }
        }

        Ok(())
    }
}
