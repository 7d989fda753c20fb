//! Error types for vrcore.
//!
//! Uses `thiserror` for ergonomic error definitions. Startup errors
//! (`ConfigError`, `RegistryError` while loading) abort the run; everything a
//! single target can hit is folded into `TaskError` and stays with that target.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or writing the profile configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config at {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("could not write config at {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid JSON in config: {0}")]
    InvalidFormat(String),

    #[error("{kind} profile '{name}' not found in config")]
    ProfileNotFound { kind: &'static str, name: String },

    #[error("invalid profile '{name}': {reason}")]
    InvalidProfile { name: String, reason: String },

    #[error("invalid runtime setting '{field}': {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("config already exists at {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised by the target registry store.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("could not read registry at {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("could not write registry at {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("target ID {0} not found in registry")]
    NotFound(String),

    #[error("registry already exists at {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised while running an external tool.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to launch {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for tool invocations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors raised while building the fingerprint prober.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Failure of a single per-target task. Never aborts the batch.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("registry update failed: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("{program} did not complete successfully: {status}")]
    ToolFailed { program: String, status: String },
}

/// Result type alias for per-target tasks.
pub type TaskResult<T> = Result<T, TaskError>;

/// Top-level error for command handlers.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Target(#[from] crate::types::TargetError),

    #[error("--fuzz requires --wordlist")]
    MissingWordlist,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for command handlers.
pub type CliResult<T> = Result<T, CliError>;
