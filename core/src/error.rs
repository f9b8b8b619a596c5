use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T, E = ToolError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool '{name}' not found")]
    NotFound { name: String },

    #[error("Tool '{tool}' does not implement call")]
    Unimplemented { tool: String },

    #[error("Invalid input for '{tool}': {message}")]
    InvalidInput { tool: String, message: String },

    #[error("Backend for '{tool}' unavailable: {message}")]
    BackendUnavailable { tool: String, message: String },

    #[error("Backend for '{tool}' timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    #[error("Backend for '{tool}' returned malformed output: {message}")]
    MalformedOutput { tool: String, message: String },

    #[error("Event store at {} is corrupt: {source}", path.display())]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to lock {}: {source}", path.display())]
    LockFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ToolError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn invalid_input(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Why the backend could not be reached, for errors a provider may
    /// report as a degraded result instead.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            Self::BackendUnavailable { message, .. } => Some(message),
            _ => None,
        }
    }
}
