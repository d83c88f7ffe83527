//! Utility functions for utilp
//!
//! Path checks, string replacement and a few filesystem helpers shared by
//! the logger and the CLI.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub mod path;
pub mod text;

/// Ensure a directory exists
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory {}", path.display()))
}

/// Get the user's home directory
pub fn get_home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Expand a leading `~` to the home directory
pub fn expand_home<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    match (path.strip_prefix("~"), get_home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
