//! # treeline-export
//!
//! Exports a remotely defined machinepack and its dependencies to local
//! folders.
//!
//! [`export`] runs the pipeline in order, stopping at the first error:
//!
//! 1. read credentials ([`ExportError::NotLoggedIn`] when absent)
//! 2. [`resolve`] the pack through a [`PackSelector`]
//! 3. [`check_destination`] for conflicts, before anything is fetched
//! 4. [`materialize`] the main pack, then its dependencies concurrently

pub mod conflict;
pub mod context;
pub mod engine;
pub mod error;
pub mod materialize;
pub mod pipeline;
pub mod resolver;

pub use conflict::check_destination;
pub use engine::PackRenderer;
pub use error::ExportError;
pub use materialize::{materialize, write_pack, ExportReport};
pub use pipeline::{export, export_blocking, ExportEnv, ExportRequest};
pub use resolver::{resolve, Choice, PackSelector, SELECT_MESSAGE};
