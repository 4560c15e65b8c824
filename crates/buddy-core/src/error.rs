use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load source table {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    #[error("Knowledgebase not found at {}; create it first", .0.display())]
    IndexMissing(PathBuf),

    #[error("Unknown personality: {0:?}")]
    UnknownPersonality(String),

    #[error("{service} service failed: {message}")]
    Upstream { service: &'static str, message: String },

    #[error("Index storage failed: {0}")]
    Storage(String),
}

impl Error {
    pub fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Load { path: path.into(), reason: reason.to_string() }
    }

    /// Wraps a failure of an external service; the full cause chain is kept in the message.
    pub fn upstream(service: &'static str, err: &anyhow::Error) -> Self {
        Self::Upstream { service, message: format!("{err:#}") }
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
