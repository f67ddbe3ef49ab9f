//! Single-path kind query (no traversal).

use std::fs::FileType;
use std::io::ErrorKind;
use std::path::Path;

use crate::PathKind;
use crate::engine::tools::{resolve_path, stat_path};
use crate::error::FsError;

#[cfg(unix)]
fn special_kind(ft: &FileType) -> PathKind {
    use std::os::unix::fs::FileTypeExt;
    if ft.is_block_device() {
        PathKind::BlockDevice
    } else if ft.is_char_device() {
        PathKind::CharacterDevice
    } else if ft.is_fifo() {
        PathKind::Fifo
    } else if ft.is_socket() {
        PathKind::Socket
    } else {
        PathKind::Unknown
    }
}

#[cfg(not(unix))]
fn special_kind(_ft: &FileType) -> PathKind {
    PathKind::Unknown
}

/// Report what `path` is. With `symbolic` a final link is reported as a link (lstat);
/// otherwise it is followed (stat) and a dangling link is `PathKind::Missing`. A missing path
/// is `PathKind::Missing`, not an error.
pub fn classify(path: &Path, symbolic: bool) -> crate::Result<PathKind> {
    let path = resolve_path(path)?;
    let meta = match stat_path(&path, symbolic) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PathKind::Missing),
        Err(e) => return Err(FsError::io(&path, e).into()),
    };
    let ft = meta.file_type();
    let kind = if ft.is_dir() {
        PathKind::Directory
    } else if ft.is_symlink() {
        PathKind::SymbolicLink
    } else if ft.is_file() {
        PathKind::File
    } else {
        special_kind(&ft)
    };
    Ok(kind)
}
