//! Error types for treeline-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from local filesystem, JSON, and configuration operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O failure, annotated with the path being touched.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse or serialization failure for a specific file.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// `write_json` refused to replace an existing file without `force`.
    #[error("refusing to overwrite existing file {path}")]
    FileExists { path: PathBuf },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`CoreError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn json_err(path: impl Into<PathBuf>, source: serde_json::Error) -> CoreError {
    CoreError::Json {
        path: path.into(),
        source,
    }
}
