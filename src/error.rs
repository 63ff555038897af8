// ABOUTME: Application-wide error types for capstan.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("required file not found: {0}")]
    MissingFile(PathBuf),

    #[error("build command failed: {command} (exit code {code:?})")]
    Build { command: String, code: Option<i32> },

    #[error("no previous versions available to roll back to")]
    NoRollbackCandidates,

    #[error("version {0} is not a rollback candidate, redeploy it from source instead")]
    VersionNotInHistory(String),

    #[error(
        "release directory for version {0} no longer exists on the host, redeploy it from source instead"
    )]
    ReleaseNotFound(String),

    #[error("unknown service: {name}, available options: {options:?}")]
    UnknownService { name: String, options: Vec<String> },

    #[error(transparent)]
    Ssh(#[from] crate::ssh::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
