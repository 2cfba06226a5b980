//! Destination check that gates every export write.

use std::path::Path;

use treeline_core::fsx::{self, Existence};

use crate::error::ExportError;

/// Fail with [`ExportError::AlreadyExists`] when `path` is taken and `force`
/// is off. Runs before anything is fetched.
pub fn check_destination(path: &Path, force: bool) -> Result<(), ExportError> {
    match fsx::exists(path)? {
        Existence::DoesNotExist => Ok(()),
        Existence::Exists if force => {
            tracing::debug!("{} exists; overwriting (force)", path.display());
            Ok(())
        }
        Existence::Exists => Err(ExportError::AlreadyExists {
            path: path.to_path_buf(),
        }),
    }
}
