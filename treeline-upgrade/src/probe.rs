//! Staleness probing for generated response files.
//!
//! No version marker is written into generated files, so staleness is
//! inferred from behavior: a legacy template reads a global the current
//! runtime no longer provides, and invoking it with the synthetic
//! [`ProbeContext`] and no argument fails with "`<global>` is not defined".
//! The invocation is traced statically; only code certain to run on that
//! call counts.
//!
//! Classification:
//! 1. `Indeterminate`: the file cannot be loaded (missing, not UTF-8, a
//!    syntax error, or a module-level read of an undefined global). Never
//!    patched.
//! 2. `NeedsPatch`: the call reads the legacy global before anything else
//!    stops it.
//! 3. `Current`: everything else, including unrelated failures.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;

use crate::cache::ContentCache;
use crate::js_scan::{analyze, scan};
use crate::js_trace::{trace_invocation, Trace};

/// Verdict for a single generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "kebab-case")]
pub enum Classification {
    Current,
    NeedsPatch,
    Indeterminate { reason: String },
}

/// The runtime a generated file is evaluated against.
///
/// Only the listed globals exist; request and response are reached through
/// `this`, so they add no names. The invocation argument is always empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeContext {
    globals: BTreeSet<String>,
}

const NODE_GLOBALS: &[&str] = &[
    "module", "exports", "require", "__dirname", "__filename", "console", "process",
    "Buffer", "global", "globalThis", "JSON", "Math", "Object", "Array", "String", "Number",
    "Boolean", "Error", "TypeError", "RangeError", "Date", "RegExp", "Promise", "Symbol",
    "Map", "Set", "WeakMap", "undefined", "NaN", "Infinity", "isNaN", "isFinite",
    "parseInt", "parseFloat", "encodeURIComponent", "decodeURIComponent", "setTimeout",
    "clearTimeout", "setInterval", "clearInterval", "setImmediate", "arguments",
];

impl ProbeContext {
    /// The stand-in runtime: Node builtins only.
    pub fn synthetic() -> Self {
        Self {
            globals: NODE_GLOBALS.iter().map(|g| g.to_string()).collect(),
        }
    }

    /// Add a global to the runtime.
    pub fn with_global(mut self, name: impl Into<String>) -> Self {
        self.globals.insert(name.into());
        self
    }

    pub fn provides(&self, name: &str) -> bool {
        self.globals.contains(name)
    }
}

impl Default for ProbeContext {
    fn default() -> Self {
        Self::synthetic()
    }
}

/// Decides whether one kind of generated file predates the current runtime.
pub trait StalenessDetector: Send + Sync {
    /// Project-relative path of the file this detector inspects.
    fn target(&self) -> &Path;

    /// Classify already-loaded file content.
    fn classify(&self, source: &str, ctx: &ProbeContext) -> Classification;
}

/// Flags files whose exported function, called with no argument, reads a
/// global the synthetic runtime does not provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyGlobalDetector {
    target: &'static str,
    legacy_global: &'static str,
}

impl LegacyGlobalDetector {
    pub const fn new(target: &'static str, legacy_global: &'static str) -> Self {
        Self {
            target,
            legacy_global,
        }
    }

    pub fn legacy_global(&self) -> &str {
        self.legacy_global
    }
}

impl StalenessDetector for LegacyGlobalDetector {
    fn target(&self) -> &Path {
        Path::new(self.target)
    }

    fn classify(&self, source: &str, ctx: &ProbeContext) -> Classification {
        let scanned = match scan(source) {
            Ok(scanned) => scanned,
            Err(err) => {
                return Classification::Indeterminate {
                    reason: format!("{} does not load: {err}", self.target),
                }
            }
        };
        let bindings = analyze(&scanned.tokens);
        match trace_invocation(&scanned, &bindings, &|name| ctx.provides(name)) {
            Trace::LoadError(name) => Classification::Indeterminate {
                reason: format!("{} does not load: {name} is not defined", self.target),
            },
            Trace::Undefined(name) if name == self.legacy_global => Classification::NeedsPatch,
            Trace::Undefined(_) | Trace::Settled => Classification::Current,
        }
    }
}

/// Load `detector.target()` below `root` through `cache` and classify it.
pub fn probe(
    root: &Path,
    detector: &dyn StalenessDetector,
    cache: &ContentCache,
    ctx: &ProbeContext,
) -> Classification {
    let path = root.join(detector.target());
    match cache.load(&path) {
        Ok(source) => detector.classify(&source, ctx),
        Err(err) if err.kind() == ErrorKind::NotFound => Classification::Indeterminate {
            reason: format!("{} not found", detector.target().display()),
        },
        Err(err) => Classification::Indeterminate {
            reason: format!("cannot read {}: {err}", path.display()),
        },
    }
}
