//! Writes a fetched export set to disk: the main pack first, then every
//! dependency concurrently below its `node_modules/`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;

use treeline_core::{
    fsx::{self, Existence},
    layout, PackData, PackId, PackSummary,
};
use treeline_remote::TreelineApi;

use crate::engine::{is_valid_pack_folder, PackRenderer};
use crate::error::{join_err, ExportError};

/// Folders written by one export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    pub pack: PackSummary,
    pub main: PathBuf,
    /// Sorted by path.
    pub dependencies: Vec<PathBuf>,
}

/// Render `data` into `dir`.
///
/// An existing `dir` is an error unless `force`; with `force` files are
/// overwritten in place and anything else in the folder is left alone.
pub fn write_pack(
    renderer: &PackRenderer,
    data: &PackData,
    dir: &Path,
    force: bool,
) -> Result<PathBuf, ExportError> {
    if !force && fsx::exists(dir)? == Existence::Exists {
        return Err(ExportError::AlreadyExists {
            path: dir.to_path_buf(),
        });
    }
    for (relative, content) in renderer.render(data)? {
        fsx::write_atomic(&dir.join(relative), content.as_bytes())?;
    }
    tracing::info!("wrote {} to {}", data.identifier, dir.display());
    Ok(dir.to_path_buf())
}

/// Split an export set into its main record and its dependencies.
///
/// Every identifier must be usable as a folder name, and no dependency
/// may appear twice.
pub fn split_main(
    id: &PackId,
    set: Vec<PackData>,
) -> Result<(PackData, Vec<PackData>), ExportError> {
    let (mut main, dependencies): (Vec<PackData>, Vec<PackData>) =
        set.into_iter().partition(|data| data.is_main);
    if main.len() != 1 {
        return Err(ExportError::MalformedPack {
            id: id.clone(),
            reason: format!("expected exactly one main pack, found {}", main.len()),
        });
    }
    let main = main.remove(0);
    if &main.identifier != id {
        return Err(ExportError::MalformedPack {
            id: id.clone(),
            reason: format!("main pack is {}", main.identifier),
        });
    }
    if let Some(bad) = std::iter::once(&main)
        .chain(&dependencies)
        .find(|data| !is_valid_pack_folder(&data.identifier.0))
    {
        return Err(ExportError::MalformedPack {
            id: id.clone(),
            reason: format!("identifier {:?} is not a valid folder name", bad.identifier.0),
        });
    }
    let mut seen = HashSet::new();
    if let Some(dup) = dependencies.iter().find(|dep| !seen.insert(&dep.identifier)) {
        return Err(ExportError::MalformedPack {
            id: id.clone(),
            reason: format!("dependency {} is listed more than once", dup.identifier),
        });
    }
    Ok((main, dependencies))
}

/// Fetch the export set for `summary` and write it below `destination`.
///
/// The main pack is complete on disk before any dependency write starts.
/// Dependency writes fan out; the first failure is returned and the
/// remaining writers are detached.
pub async fn materialize(
    api: Arc<dyn TreelineApi>,
    renderer: Arc<PackRenderer>,
    secret: String,
    summary: PackSummary,
    destination: PathBuf,
    force: bool,
) -> Result<ExportReport, ExportError> {
    let id = summary.id.clone();
    let set = tokio::task::spawn_blocking(move || api.fetch_pack(&secret, &id))
        .await
        .map_err(|e| join_err("fetch", e))??;
    tracing::debug!("export set for {} has {} record(s)", summary.id, set.len());

    let (main, dependencies) = split_main(&summary.id, set)?;

    let main_dir = {
        let renderer = Arc::clone(&renderer);
        let destination = destination.clone();
        tokio::task::spawn_blocking(move || write_pack(&renderer, &main, &destination, force))
            .await
            .map_err(|e| join_err("main pack", e))??
    };

    let mut writers = JoinSet::new();
    for dep in dependencies {
        let dep = Arc::new(dep);
        let renderer = Arc::clone(&renderer);
        let dir = layout::dependency_dir(&main_dir, &dep.identifier.0);
        writers.spawn_blocking(move || write_pack(&renderer, &dep, &dir, force));
    }

    let mut written = Vec::new();
    while let Some(joined) = writers.join_next().await {
        let result = joined.map_err(|e| join_err("dependency", e)).and_then(|r| r);
        match result {
            Ok(dir) => written.push(dir),
            Err(err) => {
                tracing::warn!("dependency export failed: {err}");
                writers.detach_all();
                return Err(err);
            }
        }
    }
    written.sort();

    Ok(ExportReport {
        pack: summary,
        main: main_dir,
        dependencies: written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use treeline_core::PackBlob;

    fn record(id: &str, is_main: bool) -> PackData {
        PackData {
            identifier: PackId::from(id),
            is_main,
            pack: PackBlob {
                friendly_name: id.to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn split_requires_exactly_one_matching_main() {
        let id = PackId::from("mp-main");

        let (main, deps) =
            split_main(&id, vec![record("mp-dep", false), record("mp-main", true)]).unwrap();
        assert_eq!(main.identifier, id);
        assert_eq!(deps.len(), 1);

        let none = split_main(&id, vec![record("mp-dep", false)]).unwrap_err();
        assert!(matches!(none, ExportError::MalformedPack { .. }));

        let two = split_main(&id, vec![record("mp-main", true), record("mp-x", true)]).unwrap_err();
        assert!(matches!(two, ExportError::MalformedPack { .. }));

        let wrong = split_main(&id, vec![record("mp-other", true)]).unwrap_err();
        assert!(wrong.to_string().contains("main pack is mp-other"));
    }

    #[test]
    fn split_rejects_dependency_path_traversal() {
        let id = PackId::from("mp-main");
        let err = split_main(&id, vec![record("mp-main", true), record("../../etc", false)])
            .unwrap_err();
        assert!(matches!(err, ExportError::MalformedPack { .. }));
    }

    #[test]
    fn split_rejects_main_id_outside_the_working_folder() {
        for escaping in ["/tmp/escaped", "../../etc"] {
            let id = PackId::from(escaping);
            let err = split_main(&id, vec![record(escaping, true)]).unwrap_err();
            assert!(matches!(err, ExportError::MalformedPack { .. }), "{escaping}: {err:?}");
        }
    }

    #[test]
    fn split_rejects_duplicate_dependencies() {
        let id = PackId::from("mp-main");
        let err = split_main(
            &id,
            vec![
                record("mp-main", true),
                record("mp-dep", false),
                record("mp-other", false),
                record("mp-dep", false),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("mp-dep is listed more than once"), "{err}");
    }

    #[test]
    fn write_pack_refuses_existing_folder_without_force() {
        let tmp = tempfile::TempDir::new().unwrap();
        let renderer = PackRenderer::new().unwrap();
        let data = record("mp-main", true);

        let err = write_pack(&renderer, &data, tmp.path(), false).unwrap_err();
        assert!(matches!(err, ExportError::AlreadyExists { .. }));

        write_pack(&renderer, &data, tmp.path(), true).unwrap();
        assert!(tmp.path().join("package.json").is_file());
        assert!(tmp.path().join("index.js").is_file());
    }
}
