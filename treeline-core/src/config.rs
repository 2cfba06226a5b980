//! Runtime settings: API endpoint and credential file location.
//!
//! Precedence for each value: explicit flag, then environment variable, then
//! built-in default. `resolve` reads the real environment and home directory;
//! `resolve_with` takes both explicitly and is what tests call.

use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::keychain;

pub const DEFAULT_API_BASE_URL: &str = "https://api.treeline.io";
pub const API_URL_ENV: &str = "TREELINE_API_URL";
pub const KEYCHAIN_ENV: &str = "TREELINE_KEYCHAIN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub keychain_path: PathBuf,
}

impl Settings {
    /// Resolve settings from flags, the process environment, and `$HOME`.
    pub fn resolve(
        api_url: Option<String>,
        keychain_path: Option<PathBuf>,
    ) -> Result<Self, CoreError> {
        let home = dirs::home_dir().ok_or(CoreError::HomeNotFound)?;
        Ok(Self::resolve_with(&home, api_url, keychain_path, |key| {
            std::env::var(key).ok()
        }))
    }

    pub fn resolve_with(
        home: &Path,
        api_url: Option<String>,
        keychain_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let api_base_url = api_url
            .or_else(|| env(API_URL_ENV))
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let keychain_path = keychain_path
            .or_else(|| env(KEYCHAIN_ENV).map(PathBuf::from))
            .unwrap_or_else(|| keychain::default_path_at(home));

        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            keychain_path,
        }
    }
}
