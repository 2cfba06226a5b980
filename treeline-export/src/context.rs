//! Rendering payload built from a fetched [`PackData`] record.

use serde::Serialize;
use serde_json::{json, Map, Value};

use treeline_core::{MachineDef, PackData};

/// Runtime the generated machine files are written against.
pub const MACHINE_RUNTIME: (&str, &str) = ("machine", "^15.0.0");

const DEFAULT_MACHINE_BODY: &str = "    return exits.success();";

#[derive(Debug, Clone, Serialize)]
pub struct PackContext {
    pub identifier: String,
    pub friendly_name: String,
    pub description: String,
    pub version: String,
    pub license: String,
    pub machines: Vec<MachineCtx>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MachineCtx {
    pub identity: String,
    pub friendly_name: String,
    pub description: String,
    /// `fn` body, indented to sit inside the generated function.
    pub body: String,
}

impl PackContext {
    pub fn from_pack(data: &PackData) -> Self {
        let pack = &data.pack;
        Self {
            identifier: data.identifier.to_string(),
            friendly_name: pack.friendly_name.clone(),
            description: pack.description.clone(),
            version: pack.version.clone(),
            license: pack.license.clone(),
            machines: pack.machines.iter().map(MachineCtx::from_def).collect(),
        }
    }

    pub fn to_tera_context(&self) -> tera::Result<tera::Context> {
        tera::Context::from_serialize(self)
    }
}

impl MachineCtx {
    fn from_def(def: &MachineDef) -> Self {
        let friendly_name = if def.friendly_name.is_empty() {
            def.identity.clone()
        } else {
            def.friendly_name.clone()
        };
        Self {
            identity: def.identity.clone(),
            friendly_name,
            description: def.description.clone(),
            body: indent_body(&def.source),
        }
    }
}

fn indent_body(source: &str) -> String {
    if source.trim().is_empty() {
        return DEFAULT_MACHINE_BODY.to_string();
    }
    source
        .trim_end()
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The npm manifest for an exported pack.
///
/// Built as JSON rather than rendered so the output is always valid.
pub fn package_manifest(data: &PackData) -> Value {
    let pack = &data.pack;

    let mut dependencies = Map::new();
    dependencies.insert(MACHINE_RUNTIME.0.to_string(), json!(MACHINE_RUNTIME.1));
    for (name, range) in &pack.dependencies {
        dependencies.insert(name.clone(), json!(range));
    }

    let mut manifest = Map::new();
    manifest.insert("name".into(), json!(data.identifier));
    manifest.insert("version".into(), json!(pack.version));
    manifest.insert("description".into(), json!(pack.description));
    manifest.insert("keywords".into(), json!(["machines", "machinepack"]));
    if let Some(author) = &pack.author {
        manifest.insert("author".into(), json!(author));
    }
    manifest.insert("license".into(), json!(pack.license));
    manifest.insert("dependencies".into(), Value::Object(dependencies));
    manifest.insert(
        "machinepack".into(),
        json!({
            "friendlyName": pack.friendly_name,
            "machineDir": "machines/",
            "machines": pack.machines.iter().map(|m| m.identity.as_str()).collect::<Vec<_>>(),
        }),
    );
    Value::Object(manifest)
}
