use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{InventoryError, Result};

/// Name of the manifest file expected in every application root.
pub const MANIFEST_FILE: &str = "package.json";

/// Decides which identifiers belong to the internal namespace and are
/// therefore kept out of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespacePolicy {
    prefixes: Vec<String>,
}

impl NamespacePolicy {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_internal(&self, identifier: &str) -> bool {
        self.prefixes.iter().any(|p| identifier.starts_with(p.as_str()))
    }
}

/// A dependency as declared in an application manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredDependency {
    pub identifier: String,
    pub spec: String,
}

/// Dependencies declared by one application.
///
/// `dependencies` and `devDependencies` are merged; all three lists keep
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub internal_dependencies: Vec<String>,
    pub other_dependencies: Vec<String>,
    pub all_dependencies: Vec<DeclaredDependency>,
}

/// Read `path` and partition its declared dependencies with `policy`.
pub fn read_manifest(path: &Path, policy: &NamespacePolicy) -> Result<Manifest> {
    let content = std::fs::read_to_string(path).map_err(|e| InventoryError::parse(path, e))?;
    parse_manifest(&content, policy).map_err(|e| InventoryError::parse(path, e))
}

fn parse_manifest(content: &str, policy: &NamespacePolicy) -> serde_json::Result<Manifest> {
    let json: Value = serde_json::from_str(content)?;

    // devDependencies are merged last, so their specifier wins; a key keeps
    // the position it was first inserted at.
    let mut merged: Map<String, Value> = Map::new();
    for section in ["dependencies", "devDependencies"] {
        if let Some(pkgs) = json.get(section).and_then(Value::as_object) {
            for (name, spec) in pkgs {
                merged.insert(name.clone(), spec.clone());
            }
        }
    }

    let mut manifest = Manifest::default();
    for (identifier, spec) in merged {
        if policy.is_internal(&identifier) {
            manifest.internal_dependencies.push(identifier.clone());
        } else {
            manifest.other_dependencies.push(identifier.clone());
        }
        manifest.all_dependencies.push(DeclaredDependency {
            identifier,
            spec: spec.as_str().unwrap_or("*").to_string(),
        });
    }

    Ok(manifest)
}
