//! Error types for treeline-upgrade.
//!
//! None of these escape [`crate::Upgrader::run`]; each failed step is folded
//! into its unit report.

use std::path::PathBuf;

use thiserror::Error;

use treeline_core::{CoreError, LinkError};

#[derive(Debug, Error)]
pub enum UpgradeError {
    /// Filesystem or JSON failure while remediating a project.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The project linker rejected the re-link.
    #[error("re-link failed: {0}")]
    Link(#[from] LinkError),

    /// Legacy link metadata with no usable `id` field.
    #[error("legacy link metadata at {path} has no id")]
    MissingLinkId { path: PathBuf },

    /// The async runtime could not be started.
    #[error("failed to start upgrade runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
