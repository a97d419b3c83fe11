//! Report renderers for the aggregated dependency list.
//!
//! - [`html`]: standalone HTML document written to the output file.
//! - [`terminal`]: table on stdout; respects `--quiet`.

pub mod html;
pub mod terminal;

use std::path::Path;

use crate::error::InventoryError;

/// Write a rendered report to `path`, creating parent directories.
pub fn write_report(path: &Path, contents: &str) -> Result<(), InventoryError> {
    let failed = |e: std::io::Error| InventoryError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(failed)?;
    }
    std::fs::write(path, contents).map_err(failed)
}
