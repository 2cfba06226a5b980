//! Credential file lookup.
//!
//! Credentials live in `<home>/.treeline.secret.json` as
//! `{ "username": "...", "secret": "..." }`. Writing the file belongs to the
//! login flow; this module only reads it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, json_err, CoreError};
use crate::types::Credentials;

pub const KEYCHAIN_FILE: &str = ".treeline.secret.json";

/// `<home>/.treeline.secret.json`. Pure, no I/O.
pub fn default_path_at(home: &Path) -> PathBuf {
    home.join(KEYCHAIN_FILE)
}

/// Read credentials from `path`.
///
/// Returns `Ok(None)` when the file does not exist (the user never logged in);
/// unreadable or malformed files are errors.
pub fn read_at(path: &Path) -> Result<Option<Credentials>, CoreError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(path, err)),
    };
    let creds = serde_json::from_str(&contents).map_err(|e| json_err(path, e))?;
    Ok(Some(creds))
}
