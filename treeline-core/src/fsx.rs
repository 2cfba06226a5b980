//! Filesystem primitives used by both pipelines.
//!
//! Writes use the `.treeline.tmp` sibling + rename pattern so a failed write
//! never leaves a half-written target behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{io_err, json_err, CoreError};

/// Result of an existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    Exists,
    DoesNotExist,
}

/// Result of [`remove_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    Absent,
}

/// Check whether anything (file, directory, or dangling symlink) lives at `path`.
pub fn exists(path: &Path) -> Result<Existence, CoreError> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Ok(Existence::Exists),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Existence::DoesNotExist),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Delete a file or a directory tree. A missing path is not an error.
pub fn remove_path(path: &Path) -> Result<Removal, CoreError> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Removal::Absent),
        Err(err) => return Err(io_err(path, err)),
    };
    let result = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(Removal::Removed),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Removal::Absent),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Atomically replace `path` with `content`, creating parent directories.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), CoreError> {
    let tmp = PathBuf::from(format!("{}.treeline.tmp", path.display()));
    write_atomic_with_tmp(path, content, &tmp)
}

fn write_atomic_with_tmp(path: &Path, content: &[u8], tmp: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;
    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Read and deserialize a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&contents).map_err(|e| json_err(path, e))
}

/// Serialize `value` as pretty JSON (two-space indent, trailing newline).
///
/// Without `force`, an existing file at `path` is left alone and
/// [`CoreError::FileExists`] is returned.
pub fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    force: bool,
) -> Result<(), CoreError> {
    if !force && exists(path)? == Existence::Exists {
        return Err(CoreError::FileExists {
            path: path.to_path_buf(),
        });
    }
    let mut json = serde_json::to_string_pretty(value).map_err(|e| json_err(path, e))?;
    json.push('\n');
    write_atomic(path, json.as_bytes())
}
