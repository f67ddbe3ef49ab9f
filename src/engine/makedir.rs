//! Idempotent directory creation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::FsError;

/// Create one directory whose parent exists. "Already exists" is success as long as the
/// existing object is a directory.
pub fn make_dir(path: &Path) -> Result<(), FsError> {
    match std::fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => ensure_is_dir(path),
        Err(e) => Err(FsError::io(path, e)),
    }
}

fn ensure_is_dir(path: &Path) -> Result<(), FsError> {
    match std::fs::metadata(path) {
        Ok(m) if m.is_dir() => Ok(()),
        Ok(_) => Err(FsError::NotADirectory(path.to_path_buf())),
        Err(e) => Err(FsError::io(path, e)),
    }
}

/// `NotADirectory` shows up when an ancestor is a file; the walk up finds and reports it.
fn is_absent(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

/// Create `path` and every missing ancestor, one segment at a time from the top down.
/// Each segment tolerates "already exists"; a segment that is a file is an error.
pub fn make_dir_all(path: &Path) -> Result<(), FsError> {
    match std::fs::metadata(path) {
        Ok(m) if m.is_dir() => return Ok(()),
        Ok(_) => return Err(FsError::NotADirectory(path.to_path_buf())),
        Err(e) if is_absent(&e) => {}
        Err(e) => return Err(FsError::io(path, e)),
    }

    let mut missing: Vec<PathBuf> = Vec::new();
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        match std::fs::metadata(ancestor) {
            Ok(m) if m.is_dir() => break,
            Ok(_) => return Err(FsError::NotADirectory(ancestor.to_path_buf())),
            Err(e) if is_absent(&e) => missing.push(ancestor.to_path_buf()),
            Err(e) => return Err(FsError::io(ancestor, e)),
        }
    }
    for dir in missing.iter().rev() {
        make_dir(dir)?;
    }
    Ok(())
}
