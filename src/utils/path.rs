//! Path validity checks
//!
//! None of these functions error: every failure to inspect the filesystem
//! counts as "no".

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Longest single path component, in bytes
const MAX_NAME_BYTES: usize = 255;

#[cfg(unix)]
const MAX_PATH_BYTES: usize = 4096;
#[cfg(not(unix))]
const MAX_PATH_BYTES: usize = 32_767;

#[cfg(windows)]
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Whether `path` is a syntactically valid pathname for this platform.
///
/// The path does not have to exist.
pub fn is_pathname_valid<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    let bytes = path.as_os_str().as_encoded_bytes();
    if bytes.is_empty() || bytes.contains(&0) || bytes.len() > MAX_PATH_BYTES {
        return false;
    }

    path.components().all(|component| match component {
        Component::Normal(name) => is_component_valid(name.as_encoded_bytes()),
        _ => true,
    })
}

fn is_component_valid(name: &[u8]) -> bool {
    if name.len() > MAX_NAME_BYTES {
        return false;
    }
    #[cfg(windows)]
    {
        let name = String::from_utf8_lossy(name);
        if name.chars().any(|c| c.is_control() || RESERVED_CHARS.contains(&c)) {
            return false;
        }
    }
    true
}

/// Directory a new file at `path` would be created in
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Whether the directory `path` would live in exists and is writable
/// by the current process
pub fn is_path_creatable<P: AsRef<Path>>(path: P) -> bool {
    let dir = parent_dir(path.as_ref());
    fs::metadata(&dir).map(|meta| meta.is_dir()).unwrap_or(false) && is_dir_writable(&dir)
}

// access(2) checks the real uid, so root passes regardless of mode bits.
#[cfg(unix)]
fn is_dir_writable(dir: &Path) -> bool {
    nix::unistd::access(dir, nix::unistd::AccessFlags::W_OK).is_ok()
}

#[cfg(not(unix))]
fn is_dir_writable(dir: &Path) -> bool {
    fs::metadata(dir)
        .map(|meta| !meta.permissions().readonly())
        .unwrap_or(false)
}

/// Whether `path` is valid and either exists or could be created
pub fn path_exists_or_creatable<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    is_pathname_valid(path) && (path.try_exists().unwrap_or(false) || is_path_creatable(path))
}

/// Whether a file can actually be created next to `path`.
///
/// Creates, and immediately removes, an anonymous temporary file in the
/// parent directory. Slower than [`is_path_creatable`] but does not rely on
/// permission bits, which is what makes it portable.
pub fn is_path_sibling_creatable<P: AsRef<Path>>(path: P) -> bool {
    tempfile::tempfile_in(parent_dir(path.as_ref())).is_ok()
}

/// Portable variant of [`path_exists_or_creatable`]
pub fn path_exists_or_creatable_portable<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    is_pathname_valid(path)
        && (path.try_exists().unwrap_or(false) || is_path_sibling_creatable(path))
}
