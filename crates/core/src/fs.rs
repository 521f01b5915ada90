//! Filesystem utilities

use std::fs;
use std::path::Path;

use log::info;

/// Create a directory and its parents, logging when something was created.
pub fn create_dir_all(path: impl AsRef<Path>) -> std::io::Result<()> {
    let path = path.as_ref();
    if !path.is_dir() {
        fs::create_dir_all(path)?;
        info!("Created directory: {}", path.display());
    }
    Ok(())
}
