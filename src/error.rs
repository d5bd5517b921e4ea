use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Failure of a single table request. Caught at the per-request boundary of a batch.
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("table '{table_id}': {reason}")]
    Parse { table_id: String, reason: String },

    #[error("writing {}: {message}", path.display())]
    Persistence { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Transport,
    Parse,
    Persistence,
}

impl ScrapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::Transport { .. } => ErrorKind::Transport,
            ScrapeError::Parse { .. } => ErrorKind::Parse,
            ScrapeError::Persistence { .. } => ErrorKind::Persistence,
        }
    }

    pub(crate) fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        ScrapeError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn parse(table_id: &str, reason: impl Into<String>) -> Self {
        ScrapeError::Parse {
            table_id: table_id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        ScrapeError::Persistence {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Parse => "parse",
            ErrorKind::Persistence => "persistence",
        }
    }
}
