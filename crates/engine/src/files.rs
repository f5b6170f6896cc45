// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem helpers for version content and build contexts

use std::fs;
use std::io;
use std::path::Path;

/// Copy a file or a directory tree from `src` to `dst`.
///
/// Returns the number of bytes copied. Symlinks inside a directory are
/// skipped.
pub fn copy_path(src: &Path, dst: &Path) -> io::Result<u64> {
    let meta = fs::metadata(src)?;
    if meta.is_dir() {
        copy_dir(src, dst)
    } else {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dst)
    }
}

fn copy_dir(src: &Path, dst: &Path) -> io::Result<u64> {
    fs::create_dir_all(dst)?;
    let mut total = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dst.join(entry.file_name());
        if file_type.is_dir() {
            total += copy_dir(&entry.path(), &target)?;
        } else if file_type.is_file() {
            total += fs::copy(entry.path(), &target)?;
        }
    }
    Ok(total)
}

/// Remove a directory tree, treating "already gone" as success.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
#[path = "files_tests.rs"]
mod tests;
