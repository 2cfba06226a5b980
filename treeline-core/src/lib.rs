//! Treeline core library: domain types, on-disk layout, local collaborators.
//!
//! - [`types`]: project, credential, and pack data shapes
//! - [`layout`]: fixed paths inside a generated project
//! - [`fsx`]: filesystem primitives (existence, atomic writes, JSON)
//! - [`keychain`]: credential file lookup
//! - [`config`]: API endpoint / credential path resolution
//! - [`link`]: the project-link collaborator contract
//! - [`error`]: [`CoreError`]

pub mod config;
pub mod error;
pub mod fsx;
pub mod keychain;
pub mod layout;
pub mod link;
pub mod types;

pub use config::Settings;
pub use error::CoreError;
pub use link::{LinkError, LinkRequest, ProjectLinker};
pub use types::{
    Credentials, LinkMetadata, MachineDef, PackBlob, PackData, PackId, PackSummary, ProjectRef,
    ProjectType,
};
