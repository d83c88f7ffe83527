//! Path command implementation
//!
//! Runs the path checks and fails when the path can neither be found nor
//! created.

use crate::cli::Output;
use crate::utils::path::{
    is_path_creatable, is_path_sibling_creatable, is_pathname_valid, path_exists_or_creatable,
    path_exists_or_creatable_portable,
};
use anyhow::{Result, bail};
use std::path::Path;

/// Execute the path command
pub fn execute(path: &Path, portable: bool, output: &Output) -> Result<()> {
    output.header(&format!("Path checks for {}", path.display()));
    output.check("valid pathname", is_pathname_valid(path));
    output.check("exists", path.try_exists().unwrap_or(false));

    let usable = if portable {
        output.check("sibling file creatable", is_path_sibling_creatable(path));
        path_exists_or_creatable_portable(path)
    } else {
        output.check("parent directory writable", is_path_creatable(path));
        path_exists_or_creatable(path)
    };

    if !usable {
        bail!("{} neither exists nor can be created", path.display());
    }
    output.success("Path exists or can be created");
    Ok(())
}
