//! # treeline-upgrade
//!
//! Best-effort remediation of previously generated projects.
//!
//! [`Upgrader::run`] probes the generated response files and patches the
//! stale ones, removes obsolete scaffolding, and migrates legacy link
//! metadata. Every step runs concurrently and independently; failures are
//! recorded in the returned [`UpgradeReport`] instead of aborting the run.

pub mod cache;
pub mod error;
mod js_scan;
mod js_trace;
pub mod legacy;
pub mod link;
pub mod orchestrator;
pub mod patch;
pub mod probe;

pub use cache::ContentCache;
pub use error::UpgradeError;
pub use link::LinkSettings;
pub use orchestrator::{UnitKind, UnitOutcome, UnitReport, UpgradeReport, Upgrader};
pub use patch::GeneratedFile;
pub use probe::{Classification, LegacyGlobalDetector, ProbeContext, StalenessDetector};
