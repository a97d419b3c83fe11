//! Error taxonomy for an inventory run.
//!
//! Every failure the pipeline can hit maps onto one [`InventoryError`]
//! variant. The binary wraps these in `anyhow` with extra context; library
//! code returns them directly so callers (and tests) can match on the kind.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    /// An application manifest is missing or is not valid JSON.
    #[error("failed to parse manifest {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// The package manager could not materialize an application's dependencies.
    #[error("installation failed in {}: {reason}", root.display())]
    Installation { root: PathBuf, reason: String },

    /// An installed dependency's own manifest could not be read.
    #[error("could not resolve metadata for '{identifier}' in {}: {reason}", root.display())]
    Resolution {
        identifier: String,
        root: PathBuf,
        reason: String,
    },

    /// The run was configured in a way that cannot work.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The report could not be written.
    #[error("failed to write report to {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },
}

impl InventoryError {
    pub fn parse(path: &Path, reason: impl ToString) -> Self {
        InventoryError::Parse {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn installation(root: &Path, reason: impl ToString) -> Self {
        InventoryError::Installation {
            root: root.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn resolution(identifier: &str, root: &Path, reason: impl ToString) -> Self {
        InventoryError::Resolution {
            identifier: identifier.to_string(),
            root: root.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-friendly label, used in the skipped-entries summary.
    pub fn kind(&self) -> &'static str {
        match self {
            InventoryError::Parse { .. } => "parse",
            InventoryError::Installation { .. } => "installation",
            InventoryError::Resolution { .. } => "resolution",
            InventoryError::Configuration(_) => "configuration",
            InventoryError::Write { .. } => "write",
        }
    }
}

pub type Result<T, E = InventoryError> = std::result::Result<T, E>;
