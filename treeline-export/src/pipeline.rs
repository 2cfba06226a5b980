//! `export` entrypoint: credentials, resolve, conflict check, materialize.
//! Each step short-circuits the rest.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use treeline_core::{keychain, PackId};
use treeline_remote::TreelineApi;

use crate::conflict::check_destination;
use crate::engine::{is_valid_pack_folder, PackRenderer};
use crate::error::{join_err, ExportError};
use crate::materialize::{materialize, ExportReport};
use crate::resolver::{resolve, PackSelector};

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// Pack named on the command line.
    pub identity: Option<PackId>,
    /// Output folder; defaults to `<cwd>/<pack id>`.
    pub destination: Option<PathBuf>,
    pub force: bool,
    pub cwd: PathBuf,
}

/// Collaborators the pipeline talks to.
#[derive(Clone)]
pub struct ExportEnv {
    pub api: Arc<dyn TreelineApi>,
    pub selector: Arc<dyn PackSelector>,
    pub keychain_path: PathBuf,
}

pub async fn export(request: ExportRequest, env: ExportEnv) -> Result<ExportReport, ExportError> {
    let credentials = keychain::read_at(&env.keychain_path)?.ok_or_else(|| {
        ExportError::NotLoggedIn {
            path: env.keychain_path.clone(),
        }
    })?;

    let summary = {
        let api = Arc::clone(&env.api);
        let selector = Arc::clone(&env.selector);
        let credentials = credentials.clone();
        let identity = request.identity.clone();
        tokio::task::spawn_blocking(move || {
            resolve(api.as_ref(), selector.as_ref(), &credentials, identity.as_ref())
        })
        .await
        .map_err(|e| join_err("resolve", e))??
    };
    tracing::info!("exporting {} ({})", summary.display_name, summary.id);

    let destination = match request.destination {
        Some(destination) => destination,
        None => default_destination(&request.cwd, &summary.id)?,
    };
    check_destination(&destination, request.force)?;

    let renderer = Arc::new(PackRenderer::new()?);
    materialize(
        env.api,
        renderer,
        credentials.secret,
        summary,
        destination,
        request.force,
    )
    .await
}

/// `<cwd>/<pack id>`; ids that are not a single folder name are refused.
fn default_destination(cwd: &Path, id: &PackId) -> Result<PathBuf, ExportError> {
    if !is_valid_pack_folder(&id.0) {
        return Err(ExportError::MalformedPack {
            id: id.clone(),
            reason: format!("pack id {:?} is not a valid folder name", id.0),
        });
    }
    Ok(cwd.join(&id.0))
}

/// Build a runtime and run [`export`] to completion on it.
pub fn export_blocking(request: ExportRequest, env: ExportEnv) -> Result<ExportReport, ExportError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| treeline_core::error::io_err("tokio-runtime", e))?;
    runtime.block_on(export(request, env))
}
