//! Fixtures shared by the unit tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{InventoryError, Result};
use crate::installer::Installer;
use crate::manifest::MANIFEST_FILE;

const STAGING_DIR: &str = ".staged";

/// Stands in for `npm install`: moves packages prepared with
/// [`stage_package`] into `node_modules` and records every call.
#[derive(Clone, Default)]
pub struct FakeInstaller {
    calls: Arc<Mutex<Vec<PathBuf>>>,
    failing: Vec<PathBuf>,
    delay: Duration,
}

impl FakeInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, root: &Path) -> Self {
        self.failing.push(root.to_path_buf());
        self
    }

    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Installer for FakeInstaller {
    async fn ensure_materialized(&self, root: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(root.to_path_buf());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failing.iter().any(|r| r == root) {
            return Err(InventoryError::installation(root, "npm ERR! network timeout"));
        }

        let staged = root.join(STAGING_DIR);
        let target = root.join("node_modules");
        if staged.exists() {
            std::fs::rename(&staged, &target).unwrap();
        } else {
            std::fs::create_dir_all(&target).unwrap();
        }
        Ok(())
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Write an application manifest into `root`.
pub fn write_app(root: &Path, manifest: &str) {
    write_file(&root.join(MANIFEST_FILE), manifest);
}

/// Write a package that is already installed under `root/node_modules`.
pub fn write_installed(root: &Path, identifier: &str, manifest: &str) {
    write_file(
        &root.join("node_modules").join(identifier).join(MANIFEST_FILE),
        manifest,
    );
}

/// Prepare a package that only appears once [`FakeInstaller`] runs.
pub fn stage_package(root: &Path, identifier: &str, manifest: &str) {
    write_file(
        &root.join(STAGING_DIR).join(identifier).join(MANIFEST_FILE),
        manifest,
    );
}
