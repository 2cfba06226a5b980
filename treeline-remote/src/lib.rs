//! # treeline-remote
//!
//! Client for the Treeline service: the [`TreelineApi`] contract used by
//! `export`, its blocking HTTP implementation, and the [`HttpLinker`] that
//! `upgrade` uses to re-link legacy projects.

pub mod api;
pub mod error;
pub mod linker;

pub use api::{HttpApi, RemoteProject, TreelineApi};
pub use error::RemoteError;
pub use linker::HttpLinker;
