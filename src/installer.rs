//! Materializing an application's dependencies on disk.
//!
//! The resolver only depends on the [`Installer`] trait; [`CommandInstaller`]
//! is the production implementation that shells out to a package manager.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::InstallConfig;
use crate::error::{InventoryError, Result};

#[async_trait]
pub trait Installer: Send + Sync {
    /// Install the dependencies declared by the manifest in `root`.
    ///
    /// Must be idempotent; afterwards every declared dependency's metadata
    /// is readable under the root's materialization directory.
    async fn ensure_materialized(&self, root: &Path) -> Result<()>;
}

/// Runs a package-manager command (`npm install` by default) in the
/// application root.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    program: String,
    args: Vec<String>,
    retries: u32,
    backoff: Duration,
}

impl CommandInstaller {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            retries: 0,
            backoff: Duration::from_secs(2),
        }
    }

    pub fn from_config(config: &InstallConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
            .with_retries(config.retries)
            .with_backoff(Duration::from_millis(config.retry_backoff_ms))
    }

    /// Extra attempts after the first failure.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Base delay between attempts; attempt `n` waits `n * backoff`.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn run_once(&self, root: &Path) -> Result<()> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(root)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                InventoryError::installation(
                    root,
                    format!("could not run `{}`: {}", self.command_line(), e),
                )
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!(root = %root.display(), "{}", stdout.trim());
        }

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(InventoryError::installation(
            root,
            format!(
                "`{}` exited with {}: {}",
                self.command_line(),
                output.status,
                stderr.trim()
            ),
        ))
    }
}

#[async_trait]
impl Installer for CommandInstaller {
    async fn ensure_materialized(&self, root: &Path) -> Result<()> {
        info!(root = %root.display(), command = %self.command_line(), "installing dependencies");

        let mut attempt = 0;
        loop {
            match self.run_once(root).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(attempt, retries = self.retries, "{}; retrying", e);
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
