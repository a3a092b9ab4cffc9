//! Filesystem utility functions
//!
//! The small set of file primitives the updaters need: read a file that may
//! not exist and replace a file atomically. Every failure keeps the path it
//! happened on.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Read a file's raw bytes, or `None` when it does not exist
///
/// Any other failure (permission denied, a directory in the way, ...) is
/// returned as an [`Error::Io`].
pub fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Create the parent directory of `path` if it is missing
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    Ok(())
}

/// Write a file atomically
///
/// Writes to a sibling temp file first, then renames it over the target so a
/// crash never leaves a half-written file behind. A symlinked target is
/// written through (the link stays), and an existing file keeps its
/// permissions.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    replace_file(path, contents, false)
}

/// Like [`write_atomic`], for files holding secrets
///
/// The temp file, and a target that did not exist yet, are owner-only
/// (`0600`) on unix.
pub fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    replace_file(path, contents, true)
}

fn replace_file(path: &Path, contents: &[u8], private: bool) -> Result<()> {
    let target = resolve_symlink(path);
    ensure_parent_dir(&target)?;

    let existing = fs::metadata(&target).ok().map(|m| m.permissions());

    let temp_path = temp_sibling(&target);
    let staged = write_new_file(&temp_path, contents, private).and_then(|()| match existing {
        Some(permissions) => fs::set_permissions(&temp_path, permissions),
        None => Ok(()),
    });
    if let Err(e) = staged {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&temp_path, e));
    }

    fs::rename(&temp_path, &target).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::io(&target, e)
    })
}

/// The file a symlink points at, or `path` itself
fn resolve_symlink(path: &Path) -> PathBuf {
    let is_link = fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink());
    if !is_link {
        return path.to_path_buf();
    }

    // A dangling link still names the file to create.
    fs::canonicalize(path)
        .or_else(|_| {
            fs::read_link(path).map(|link| match path.parent() {
                Some(parent) => parent.join(link),
                None => link,
            })
        })
        .unwrap_or_else(|_| path.to_path_buf())
}

fn write_new_file(path: &Path, contents: &[u8], private: bool) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if private {
            options.mode(0o600);
        }
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;

    // A stale temp file keeps its old mode; `mode` only applies on create.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if private {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
    }
    #[cfg(not(unix))]
    let _ = private;

    file.sync_all()
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
