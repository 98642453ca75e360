//! JSON plugin manifests (`console-extensions.json` style).
//!
//! # Responsibility
//! - Parse a plugin manifest into a `Plugin` of raw declarations.
//! - Bind `{"$codeRef": "<name>"}` properties to loaders from a `CodeRefTable`.
//!
//! # Invariants
//! - Unknown extension tags pass through untouched; the registry rejects them.
//! - One malformed entry never fails the manifest. It becomes a declaration
//!   the registry skips, or loses only its malformed part.
//! - An unbound code ref never fails parsing. It becomes a deferred field that
//!   fails on resolution, isolating the failure to its extension.

use crate::extension::deferred::{DeferredField, LoadResult, LoaderHandle};
use crate::extension::flags::ExtensionFlags;
use crate::extension::model::{ExtensionDeclaration, Property};
use crate::plugin::Plugin;
use log::warn;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key marking a property as a code reference.
pub const CODE_REF_KEY: &str = "$codeRef";

/// Manifest read/parse errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read plugin manifest `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("plugin manifest is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("plugin manifest name must not be empty")]
    EmptyName,
}

/// Named loaders that manifests may reference.
#[derive(Debug, Clone, Default)]
pub struct CodeRefTable {
    loaders: BTreeMap<String, LoaderHandle>,
}

impl CodeRefTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a loader under `name`, replacing any previous binding.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, loader: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LoadResult> + Send + 'static,
    {
        self.loaders.insert(name.into(), LoaderHandle::new(loader));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.loaders.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// A fresh deferred field for `name`; unbound names yield a failing field.
    fn field(&self, name: &str) -> DeferredField {
        match self.loaders.get(name) {
            Some(handle) => handle.field(),
            None => DeferredField::failing(format!("unresolved code reference: {name}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    name: String,
    #[serde(default)]
    extensions: Vec<Value>,
}

/// Parses a manifest of the form `{"name": ..., "extensions": [...]}`.
///
/// Only the outer shape is strict. Each entry of `extensions` becomes one
/// declaration even when it is malformed; see `declaration_from_entry`.
pub fn parse_plugin(json: &str, code_refs: &CodeRefTable) -> Result<Plugin, ManifestError> {
    let manifest: RawManifest = serde_json::from_str(json)?;
    build_plugin(manifest.name, manifest.extensions, code_refs)
}

/// Parses a bare extension array for a plugin whose name is known elsewhere.
pub fn parse_extensions(
    name: &str,
    json: &str,
    code_refs: &CodeRefTable,
) -> Result<Plugin, ManifestError> {
    let extensions: Vec<Value> = serde_json::from_str(json)?;
    build_plugin(name.to_string(), extensions, code_refs)
}

/// Reads and parses one manifest file.
pub fn read_plugin(path: &Path, code_refs: &CodeRefTable) -> Result<Plugin, ManifestError> {
    let json = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_plugin(&json, code_refs)
}

fn build_plugin(
    name: String,
    extensions: Vec<Value>,
    code_refs: &CodeRefTable,
) -> Result<Plugin, ManifestError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(ManifestError::EmptyName);
    }

    let declarations: Vec<ExtensionDeclaration> = extensions
        .into_iter()
        .enumerate()
        .map(|(index, entry)| declaration_from_entry(&name, index, entry, code_refs))
        .collect();
    Ok(Plugin::with_extensions(name, declarations))
}

/// Converts one manifest entry into a declaration without ever failing.
///
/// A missing `type` yields an empty tag and a non-string `type` yields its
/// JSON text, so the registry skips the entry as an unknown type. Malformed
/// `properties` or `flags` are dropped with a warning.
fn declaration_from_entry(
    plugin: &str,
    index: usize,
    entry: Value,
    code_refs: &CodeRefTable,
) -> ExtensionDeclaration {
    let mut entry = match entry {
        Value::Object(entry) => entry,
        other => {
            warn!(
                "event=manifest_entry_malformed module=manifest status=warn plugin={} index={} reason=not_an_object",
                plugin, index
            );
            return ExtensionDeclaration::new(other.to_string());
        }
    };

    let type_tag = match entry.remove("type") {
        Some(Value::String(tag)) => tag,
        Some(other) => other.to_string(),
        None => String::new(),
    };
    let mut declaration =
        ExtensionDeclaration::new(type_tag).with_flags(entry_flags(plugin, index, &mut entry));

    let properties = match entry.remove("properties") {
        Some(Value::Object(properties)) => properties,
        None | Some(Value::Null) => Map::new(),
        Some(_) => {
            warn!(
                "event=manifest_entry_malformed module=manifest status=warn plugin={} index={} reason=properties_not_an_object",
                plugin, index
            );
            Map::new()
        }
    };

    for (key, value) in properties {
        let property = match code_ref_name(&value) {
            Some(reference) => {
                if !code_refs.contains(reference) {
                    warn!(
                        "event=code_ref_unresolved module=manifest status=warn plugin={} type={} property={} code_ref={}",
                        plugin, declaration.type_tag, key, reference
                    );
                }
                Property::Deferred(code_refs.field(reference))
            }
            None => Property::Immediate(value),
        };
        declaration = declaration.with_property(key, property);
    }
    declaration
}

fn entry_flags(plugin: &str, index: usize, entry: &mut Map<String, Value>) -> ExtensionFlags {
    let flags = match entry.remove("flags") {
        None | Some(Value::Null) => return ExtensionFlags::default(),
        Some(flags) => flags,
    };
    serde_json::from_value(flags).unwrap_or_else(|err| {
        warn!(
            "event=manifest_entry_malformed module=manifest status=warn plugin={} index={} reason=invalid_flags error={}",
            plugin, index, err
        );
        ExtensionFlags::default()
    })
}

fn code_ref_name(value: &Value) -> Option<&str> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.get(CODE_REF_KEY)?.as_str()
}
