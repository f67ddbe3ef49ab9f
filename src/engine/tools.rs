//! Path, exclusion and formatting utilities

use std::fs::Metadata;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::FsError;

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

fn significant(path: &Path) -> impl Iterator<Item = Component<'_>> {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
}

/// True if the root-relative path `rel` equals one of the exclusion fragments, compared
/// segment by segment (`node_modules` matches only the top-level `node_modules`,
/// `a/b` matches `a/b`).
pub fn is_excluded(rel: &Path, exclude: &[String]) -> bool {
    exclude
        .iter()
        .any(|fragment| significant(rel).eq(significant(Path::new(fragment))))
}

/// Resolve `path` against the working directory without touching the filesystem.
pub fn resolve_path(path: &Path) -> Result<PathBuf, FsError> {
    std::path::absolute(path).map_err(|e| FsError::io(path, e))
}

/// `lstat` when `symbolic`, `stat` otherwise.
pub fn stat_path(path: &Path, symbolic: bool) -> io::Result<Metadata> {
    if symbolic {
        std::fs::symlink_metadata(path)
    } else {
        std::fs::metadata(path)
    }
}

/// Thousands separators: `1234567` -> `1,234,567`.
pub fn commas(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i).is_multiple_of(3) {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
