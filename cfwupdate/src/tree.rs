//! Directory tree operations used when applying updates.
//!
//! Copies are merges: files present in the source overwrite their
//! counterparts in the destination, everything else in the destination is
//! left alone. Nothing here ever deletes from a destination tree.

use std::fs;
use std::path::Path;

use crate::error::{UpdateError, UpdateResult};

/// Recursively merge-copy `source` onto `dest`.
///
/// `dest` and any missing intermediate directories are created.
///
/// # Returns
///
/// The number of files copied.
pub fn merge_copy(source: &Path, dest: &Path) -> UpdateResult<usize> {
    fs::create_dir_all(dest).map_err(|e| UpdateError::CreateDirFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let mut copied = 0;

    for entry in fs::read_dir(source).map_err(|e| UpdateError::ReadFailed {
        path: source.to_path_buf(),
        source: e,
    })? {
        let entry = entry.map_err(|e| UpdateError::ReadFailed {
            path: source.to_path_buf(),
            source: e,
        })?;

        let source_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if source_path.is_dir() {
            copied += merge_copy(&source_path, &dest_path)?;
        } else {
            fs::copy(&source_path, &dest_path).map_err(|e| UpdateError::WriteFailed {
                path: dest_path,
                source: e,
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Remove a directory tree if it exists.
///
/// Returns `true` when something was removed.
pub fn remove_tree(dir: &Path) -> UpdateResult<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }

    fs::remove_dir_all(dir).map_err(|e| UpdateError::WriteFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    Ok(true)
}

/// Count files recursively in a directory.
pub fn count_files(dir: &Path) -> UpdateResult<usize> {
    let mut count = 0;

    if !dir.exists() {
        return Ok(0);
    }

    let entries = fs::read_dir(dir).map_err(|e| UpdateError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            count += 1;
        } else if path.is_dir() {
            count += count_files(&path)?;
        }
    }

    Ok(count)
}
