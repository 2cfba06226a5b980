//! Fixed, project-relative locations Treeline reads and writes.

use std::path::{Path, PathBuf};

pub const LINK_FILE: &str = "treeline.json";
pub const MANIFEST_FILE: &str = "package.json";
pub const NODE_MODULES_DIR: &str = "node_modules";

pub const SERVER_ERROR_RESPONSE: &str = "api/responses/serverError.js";
pub const NEGOTIATE_RESPONSE: &str = "api/responses/negotiate.js";

pub const LEGACY_MACHINES_DIR: &str = "api/machines";
pub const LEGACY_HOOK_DEPENDENCY: &str = "sails-hook-machines";
pub const LEGACY_POSTINSTALL_SCRIPT: &str = "postinstall.js";

/// Marker field only present in the legacy link schema.
pub const LEGACY_LINK_MARKER: &str = "fullName";

pub fn link_path(root: &Path) -> PathBuf {
    root.join(LINK_FILE)
}

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE)
}

pub fn node_modules_dir(root: &Path) -> PathBuf {
    root.join(NODE_MODULES_DIR)
}

pub fn legacy_machines_dir(root: &Path) -> PathBuf {
    root.join(LEGACY_MACHINES_DIR)
}

pub fn legacy_hook_dir(root: &Path) -> PathBuf {
    node_modules_dir(root).join(LEGACY_HOOK_DEPENDENCY)
}

pub fn legacy_postinstall_path(root: &Path) -> PathBuf {
    node_modules_dir(root).join(LEGACY_POSTINSTALL_SCRIPT)
}

/// Folder a dependency pack is exported into, below the main pack's root.
pub fn dependency_dir(root: &Path, identifier: &str) -> PathBuf {
    node_modules_dir(root).join(identifier)
}
