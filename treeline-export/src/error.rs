//! Error types for treeline-export.

use std::path::PathBuf;

use thiserror::Error;

use treeline_core::{CoreError, PackId};
use treeline_remote::RemoteError;

/// Every way an export can stop. The first one encountered ends the run.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No credential file; the user has to log in first.
    #[error("not logged in (no credentials at {path})")]
    NotLoggedIn { path: PathBuf },

    /// The destination folder is already there and `--force` was not given.
    #[error("{path} already exists (use --force to overwrite)")]
    AlreadyExists { path: PathBuf },

    /// Exporting a pack named on the command line is not supported yet.
    #[error("exporting a pack by identity is not implemented; run without --id to choose from a list")]
    NotImplemented,

    #[error("this account has no machinepacks to export")]
    NoPacks,

    #[error("no machinepack with id {id}")]
    UnknownSelection { id: PackId },

    /// The selection prompt could not be completed.
    #[error("selection aborted: {0}")]
    Prompt(String),

    /// The export set returned by the service is unusable.
    #[error("malformed export for {id}: {reason}")]
    MalformedPack { id: PackId, reason: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Render(#[from] tera::Error),

    #[error("{task} task join failure: {message}")]
    Join { task: String, message: String },
}

pub(crate) fn join_err(task: impl Into<String>, err: tokio::task::JoinError) -> ExportError {
    ExportError::Join {
        task: task.into(),
        message: err.to_string(),
    }
}
