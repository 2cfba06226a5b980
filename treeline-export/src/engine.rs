//! Tera renderer for exported packs.
//!
//! | Output                       | Source                          |
//! |------------------------------|---------------------------------|
//! | `package.json`               | [`package_manifest`] (JSON)     |
//! | `index.js`                   | `index.js.tera`                 |
//! | `README.md`                  | `README.md.tera`                |
//! | `machines/<identity>.js`     | `machine.js.tera`, per machine  |

use std::path::{Component, Path, PathBuf};

use tera::Tera;

use treeline_core::{layout, PackData};

use crate::context::{package_manifest, PackContext};
use crate::error::ExportError;

const TPLS: &[(&str, &str)] = &[
    ("index.js.tera", include_str!("templates/index.js.tera")),
    ("machine.js.tera", include_str!("templates/machine.js.tera")),
    ("README.md.tera", include_str!("templates/README.md.tera")),
];

pub const MACHINES_DIR: &str = "machines";

fn build_tera() -> Result<Tera, ExportError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TPLS.iter().copied())?;
    Ok(tera)
}

/// Renders every file of one pack folder. Shared read-only across the
/// concurrent dependency writers.
pub struct PackRenderer {
    tera: Tera,
}

impl PackRenderer {
    pub fn new() -> Result<Self, ExportError> {
        Ok(Self { tera: build_tera()? })
    }

    /// Render all files for `data`.
    ///
    /// Returns `(relative_path, content)` pairs; `package.json` comes first.
    pub fn render(&self, data: &PackData) -> Result<Vec<(PathBuf, String)>, ExportError> {
        for machine in &data.pack.machines {
            if !is_plain_file_stem(&machine.identity) {
                return Err(ExportError::MalformedPack {
                    id: data.identifier.clone(),
                    reason: format!("machine identity {:?} is not a valid file name", machine.identity),
                });
            }
        }

        let ctx = PackContext::from_pack(data);
        let tera_ctx = ctx.to_tera_context()?;

        let mut manifest = serde_json::to_string_pretty(&package_manifest(data)).map_err(|e| {
            ExportError::MalformedPack {
                id: data.identifier.clone(),
                reason: e.to_string(),
            }
        })?;
        manifest.push('\n');

        let mut files = vec![
            (PathBuf::from(layout::MANIFEST_FILE), manifest),
            (
                PathBuf::from("index.js"),
                self.tera.render("index.js.tera", &tera_ctx)?,
            ),
            (
                PathBuf::from("README.md"),
                self.tera.render("README.md.tera", &tera_ctx)?,
            ),
        ];

        for machine in &ctx.machines {
            let mut machine_ctx = tera_ctx.clone();
            machine_ctx.insert("machine", machine);
            files.push((
                Path::new(MACHINES_DIR).join(format!("{}.js", machine.identity)),
                self.tera.render("machine.js.tera", &machine_ctx)?,
            ));
        }
        Ok(files)
    }
}

/// A single normal path component with no separators.
fn is_plain_file_stem(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// Whether `identifier` is safe to use as a folder below `node_modules`.
///
/// npm scoped names (`@scope/name`) are the only nested form allowed.
pub fn is_valid_pack_folder(identifier: &str) -> bool {
    if identifier.is_empty() || identifier.contains('\\') {
        return false;
    }
    let parts: Vec<&str> = identifier.split('/').collect();
    match parts.as_slice() {
        [name] => is_plain_file_stem(name),
        [scope, name] => scope.starts_with('@') && is_plain_file_stem(scope) && is_plain_file_stem(name),
        _ => false,
    }
}
