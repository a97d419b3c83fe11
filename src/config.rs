use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::InventoryError;
use crate::manifest::NamespacePolicy;

/// Root configuration structure, deserialized from `.dep-inventory/config.toml`.
///
/// Every key is optional; missing keys take the values of [`Config::default`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application roots to inventory, in report order. Paths given on the
    /// command line replace this list.
    pub applications: Vec<PathBuf>,
    /// Where the HTML report is written.
    pub output: PathBuf,
    pub namespace: NamespaceConfig,
    pub install: InstallConfig,
    pub resolve: ResolveConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Identifiers starting with any of these are internal and never reported.
    pub internal_prefixes: Vec<String>,
}

/// How an application's dependencies get materialized.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Directory under each application root holding installed packages.
    pub materialization_dir: String,
    /// Extra install attempts after a failure.
    pub retries: u32,
    /// Base delay between install attempts, in milliseconds.
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Upper bound on concurrent metadata resolutions within one application.
    pub concurrency: usize,
    /// Record per-application failures and carry on instead of aborting.
    pub keep_going: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            applications: Vec::new(),
            output: PathBuf::from("dependencies.html"),
            namespace: NamespaceConfig::default(),
            install: InstallConfig::default(),
            resolve: ResolveConfig::default(),
        }
    }
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        NamespaceConfig {
            internal_prefixes: vec!["@minus5".to_string()],
        }
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        InstallConfig {
            program: "npm".to_string(),
            args: vec!["install".to_string()],
            materialization_dir: "node_modules".to_string(),
            retries: 0,
            retry_backoff_ms: 2000,
        }
    }
}

impl Default for ResolveConfig {
    fn default() -> Self {
        ResolveConfig {
            concurrency: 8,
            keep_going: false,
        }
    }
}

impl Config {
    pub fn namespace_policy(&self) -> NamespacePolicy {
        NamespacePolicy::new(self.namespace.internal_prefixes.iter().cloned())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), InventoryError> {
        if self.resolve.concurrency == 0 {
            return Err(InventoryError::Configuration(
                "resolve.concurrency must be at least 1".to_string(),
            ));
        }
        if self.install.program.trim().is_empty() {
            return Err(InventoryError::Configuration(
                "install.program must not be empty".to_string(),
            ));
        }
        if self.install.materialization_dir.trim().is_empty() {
            return Err(InventoryError::Configuration(
                "install.materialization_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`, the path passed via `--config`
/// 2. `<project_path>/.dep-inventory/config.toml`
/// 3. `~/.config/dep-inventory/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path.join(".dep-inventory").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("dep-inventory")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
}
