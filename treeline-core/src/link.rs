//! Contract for re-establishing the link between a local project and its
//! remote counterpart. The HTTP implementation lives in `treeline-remote`.

use std::path::PathBuf;

use thiserror::Error;

use crate::error::CoreError;
use crate::types::ProjectType;

/// Everything a linker needs to (re)write a project's link metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRequest {
    pub project_type: ProjectType,
    pub dir: PathBuf,
    pub id: String,
    pub credentials_path: PathBuf,
    pub api_base_url: String,
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("not logged in (no credentials at {path})")]
    NotLoggedIn { path: PathBuf },

    #[error("remote lookup failed: {0}")]
    Remote(String),

    #[error(transparent)]
    Storage(#[from] CoreError),
}

pub trait ProjectLinker: Send + Sync {
    fn establish_link(&self, request: &LinkRequest) -> Result<(), LinkError>;
}
