//! Turns input documents into root schemas.
//!
//! Recognised documents:
//! - `CustomResourceDefinition` (`apiextensions.k8s.io/v1` versions, or the
//!   legacy `spec.validation` schema): one root per served version.
//! - OpenAPI v3 (`components.schemas`) and Swagger (`definitions`): one root per
//!   named schema, all sharing a registry of the named schemas.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use walkdir::WalkDir;

use crate::builder::RootSchema;
use crate::error::LoadError;
use crate::registry::SchemaRegistry;
use crate::schema::SchemaNode;
use crate::settings::BuildConfig;

const CRD_KIND: &str = "CustomResourceDefinition";

/// Extensions picked up when an input is a directory.
const INPUT_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Parses JSON or YAML `text` (YAML streams may hold several documents).
///
/// `template` supplies prefix and suffix for every root. Its package, when
/// non-empty, replaces the package derived from a CRD's API group and is the
/// package of OpenAPI schemas whose names carry none.
///
/// # Errors
///
/// Returns `LoadError` for unparsable text, documents that are neither a CRD
/// nor an OpenAPI/Swagger document, and CRDs missing their names.
pub fn load_str(
    text: &str,
    label: &str,
    template: &BuildConfig,
) -> Result<Vec<RootSchema>, LoadError> {
    let mut documents: Vec<Value> = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value: Value = Value::deserialize(document)?;
        flatten_into(value, &mut documents);
    }

    let mut roots: Vec<RootSchema> = Vec::new();
    for (index, document) in documents.iter().enumerate() {
        if document.get("kind").and_then(Value::as_str) == Some(CRD_KIND) {
            roots.extend(crd_roots(document, label, template)?);
        } else if let Some(schemas) = document.pointer("/components/schemas") {
            roots.extend(named_roots(schemas, &["components", "schemas"], label, template)?);
        } else if let Some(schemas) = document.get("definitions") {
            roots.extend(named_roots(schemas, &["definitions"], label, template)?);
        } else {
            return Err(LoadError::Unrecognized { index });
        }
    }
    tracing::debug!(input = label, roots = roots.len(), "document loaded");
    Ok(roots)
}

/// Reads `path` and loads it with [`load_str`], labelling roots by the path.
///
/// # Errors
///
/// Returns `LoadError::Io` when the file cannot be read, otherwise as [`load_str`].
pub fn load_file(path: &Path, template: &BuildConfig) -> Result<Vec<RootSchema>, LoadError> {
    let text: String = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_str(&text, &path.display().to_string(), template)
}

/// Files `path` stands for: the path itself, or every `.json`, `.yaml` and
/// `.yml` file below a directory, in file-name order. Links are followed.
///
/// # Errors
///
/// Returns `LoadError::Io` if the directory tree cannot be read.
pub fn input_files(path: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
        let entry: walkdir::DirEntry = entry.map_err(|error| {
            let failed: PathBuf = error.path().unwrap_or(path).to_path_buf();
            LoadError::Io {
                path: failed,
                source: error.into(),
            }
        })?;
        let wanted: bool = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .is_some_and(|ext| INPUT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if wanted {
            files.push(entry.into_path());
        }
    }
    tracing::debug!(dir = %path.display(), files = files.len(), "directory expanded");
    Ok(files)
}

/// Splits top-level arrays and `kind: List` wrappers into their items.
fn flatten_into(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        Value::Object(mut map)
            if map.get("kind").and_then(Value::as_str) == Some("List")
                && map.get("items").is_some_and(Value::is_array) =>
        {
            if let Some(items) = map.remove("items") {
                flatten_into(items, out);
            }
        }
        other => out.push(other),
    }
}

fn crd_roots(
    crd: &Value,
    label: &str,
    template: &BuildConfig,
) -> Result<Vec<RootSchema>, LoadError> {
    let spec: &Value = crd
        .get("spec")
        .ok_or(LoadError::MalformedCrd { field: "spec" })?;
    let kind: &str = spec
        .pointer("/names/kind")
        .and_then(Value::as_str)
        .ok_or(LoadError::MalformedCrd {
            field: "spec.names.kind",
        })?;
    let base_package: String = if template.package.is_empty() {
        let group: &str = spec
            .get("group")
            .and_then(Value::as_str)
            .ok_or(LoadError::MalformedCrd { field: "spec.group" })?;
        reverse_group(group)
    } else {
        template.package.clone()
    };
    let legacy: Option<&Value> = spec.pointer("/validation/openAPIV3Schema");

    let mut versions: Vec<(&str, &Value)> = Vec::new();
    match spec.get("versions").and_then(Value::as_array) {
        Some(declared) => {
            for version in declared {
                if version.get("served").and_then(Value::as_bool) == Some(false) {
                    continue;
                }
                let name: &str = version
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or(LoadError::MalformedCrd {
                        field: "spec.versions[].name",
                    })?;
                let schema: Option<&Value> = version.pointer("/schema/openAPIV3Schema").or(legacy);
                if let Some(schema) = schema {
                    versions.push((name, schema));
                } else {
                    tracing::warn!(input = label, version = name, "CRD version has no schema");
                }
            }
        }
        None => {
            let name: &str = spec
                .get("version")
                .and_then(Value::as_str)
                .ok_or(LoadError::MalformedCrd {
                    field: "spec.versions",
                })?;
            let schema: &Value = legacy.ok_or(LoadError::MalformedCrd {
                field: "spec.validation.openAPIV3Schema",
            })?;
            versions.push((name, schema));
        }
    }

    let mut roots: Vec<RootSchema> = Vec::with_capacity(versions.len());
    for (version, schema) in versions {
        let schema: SchemaNode = SchemaNode::deserialize(schema)?;
        let config: BuildConfig = BuildConfig {
            package: format!("{base_package}.{version}"),
            root_name: kind.to_string(),
            ..template.clone()
        };
        roots.push(RootSchema::new(format!("{label}#{version}"), schema, config));
    }
    Ok(roots)
}

fn named_roots(
    schemas: &Value,
    section: &[&str],
    label: &str,
    template: &BuildConfig,
) -> Result<Vec<RootSchema>, LoadError> {
    let named: indexmap::IndexMap<String, SchemaNode> = indexmap::IndexMap::deserialize(schemas)?;
    let mut registry = SchemaRegistry::new();
    registry.insert_section(section, &named);
    let registry: Arc<SchemaRegistry> = Arc::new(registry);

    let base: String = section
        .iter()
        .fold(crate::json_pointer::ROOT.to_string(), |path, segment| {
            crate::json_pointer::format(&path, segment)
        });
    Ok(named
        .into_iter()
        .map(|(name, schema)| {
            let config = BuildConfig {
                root_name: name.clone(),
                ..template.clone()
            };
            RootSchema::new(format!("{label}#{name}"), schema, config)
                .with_registry(Arc::clone(&registry))
                .with_source(crate::json_pointer::format(&base, &name))
        })
        .collect())
}

/// `example.com` -> `com.example`.
#[must_use]
pub fn reverse_group(group: &str) -> String {
    group
        .split('.')
        .filter(|part| !part.is_empty())
        .rev()
        .collect::<Vec<&str>>()
        .join(".")
}
