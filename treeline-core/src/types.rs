//! Domain types shared by the upgrade and export pipelines.
//!
//! All path fields use `PathBuf`. Remote payloads use the service's camelCase
//! JSON field names.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of a remote machinepack (also its npm package name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackId(pub String);

impl fmt::Display for PackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PackId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PackId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Kind of locally generated project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    #[default]
    App,
    Machinepack,
}

impl ProjectType {
    /// Plural collection name used by the remote API (`apps`, `machinepacks`).
    pub fn api_collection(&self) -> &'static str {
        match self {
            ProjectType::App => "apps",
            ProjectType::Machinepack => "machinepacks",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectType::App => write!(f, "app"),
            ProjectType::Machinepack => write!(f, "machinepack"),
        }
    }
}

/// The local target of an upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub root: PathBuf,
    pub project_type: ProjectType,
}

impl ProjectRef {
    pub fn new(root: impl Into<PathBuf>, project_type: ProjectType) -> Self {
        Self {
            root: root.into(),
            project_type,
        }
    }

    /// Resolve a project-relative path.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn is_app(&self) -> bool {
        self.project_type == ProjectType::App
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Account credentials read from the local credential file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Remote packs
// ---------------------------------------------------------------------------

/// One pack visible to the authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackSummary {
    pub id: PackId,
    pub display_name: String,
}

/// One record of an exported pack set.
///
/// A set returned by the service holds exactly one record with
/// `is_main == true`; the rest are the main pack's dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackData {
    pub identifier: PackId,
    #[serde(default)]
    pub is_main: bool,
    pub pack: PackBlob,
}

/// Code and metadata for a single pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PackBlob {
    pub friendly_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default = "default_license")]
    pub license: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub machines: Vec<MachineDef>,
}

/// A single machine (one exported function) inside a pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineDef {
    pub identity: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub description: String,
    /// Body of the machine's `fn` implementation.
    #[serde(default)]
    pub source: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_license() -> String {
    "MIT".to_string()
}

// ---------------------------------------------------------------------------
// Link metadata
// ---------------------------------------------------------------------------

/// Current-schema contents of `treeline.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMetadata {
    pub id: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub identity: String,
    pub display_name: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_id_display_and_equality() {
        assert_eq!(PackId::from("machinepack-github").to_string(), "machinepack-github");
        assert_eq!(PackId::from("a"), PackId::from(String::from("a")));
    }

    #[test]
    fn project_type_display_and_collection() {
        assert_eq!(ProjectType::App.to_string(), "app");
        assert_eq!(ProjectType::Machinepack.to_string(), "machinepack");
        assert_eq!(ProjectType::Machinepack.api_collection(), "machinepacks");
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = Credentials {
            username: "rachael".into(),
            secret: "hunter2".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("rachael"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn pack_data_parses_service_payload_with_defaults() {
        let json = r#"{
            "identifier": "machinepack-math",
            "isMain": true,
            "pack": { "friendlyName": "Math", "machines": [{ "identity": "add" }] }
        }"#;
        let pack: PackData = serde_json::from_str(json).expect("parse");
        assert!(pack.is_main);
        assert_eq!(pack.pack.version, "0.1.0");
        assert_eq!(pack.pack.license, "MIT");
        assert_eq!(pack.pack.machines[0].identity, "add");
        assert!(pack.pack.machines[0].source.is_empty());
    }

    #[test]
    fn link_metadata_uses_type_key() {
        let meta = LinkMetadata {
            id: "42".into(),
            project_type: ProjectType::App,
            identity: "my-app".into(),
            display_name: "My App".into(),
        };
        let value = serde_json::to_value(&meta).expect("serialize");
        assert_eq!(value["type"], "app");
        assert_eq!(value["displayName"], "My App");
        assert!(value.get("fullName").is_none());
    }
}
