// ABOUTME: SSH-specific error types.
// ABOUTME: Separates session-level failures from remote command failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed for {user}@{host}:{port} ({attempted})")]
    AuthenticationFailed {
        user: String,
        host: String,
        port: u16,
        /// Which credential path was tried, so the user knows what to fix.
        attempted: String,
    },

    #[error("SSH agent not available: {0}")]
    AgentUnavailable(String),

    #[error("failed to load key from {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    #[error("remote command failed with exit code {exit_code}: {command}\n{stderr}")]
    CommandFailed {
        command: String,
        exit_code: u32,
        stderr: String,
    },

    #[error("failed to run remote command: {0}")]
    Channel(String),

    #[error("command timed out after {0:?}")]
    CommandTimeout(std::time::Duration),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("file transfer to {remote} failed: {reason}")]
    Transfer { remote: String, reason: String },

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("SSH key error: {0}")]
    Key(#[from] russh::keys::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
