use std::path::{Path, PathBuf};

use thiserror::Error;

/// Structural failures. Row-level problems never surface here; they are
/// reported as [`crate::types::Diagnostic`]s and counted instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Source unavailable: {}: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("Write failure: {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn source_unavailable(path: &Path, reason: impl ToString) -> Self {
        Self::SourceUnavailable { path: path.to_path_buf(), reason: reason.to_string() }
    }

    pub fn write_failure(path: &Path, source: impl Into<std::io::Error>) -> Self {
        Self::WriteFailure { path: path.to_path_buf(), source: source.into() }
    }

    /// Short machine-readable code used in run summaries.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "invalid_config",
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::WriteFailure { .. } => "write_failure",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
