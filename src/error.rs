//! Typed failures raised by the walk and the engines.
//!
//! Public functions return [`crate::Result`] (anyhow); callers that need to tell a missing
//! root from a real I/O failure use `err.downcast_ref::<FsError>()`.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    /// The requested root does not exist.
    #[error("{} is not a file or directory", .0.display())]
    NotFound(PathBuf),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A multi-item operation failed after `completed` items succeeded.
    #[error("failed after {completed} files")]
    Batch {
        completed: usize,
        #[source]
        source: Box<FsError>,
    },

    #[error("destination directory {} is a file", .0.display())]
    NotADirectory(PathBuf),

    /// A directory copy whose destination equals or lies inside its source.
    #[error(
        "destination {} equals or points inside the source directory {}",
        destination.display(),
        source_dir.display()
    )]
    DestinationInsideSource {
        source_dir: PathBuf,
        destination: PathBuf,
    },

    #[error("file system loop found: {} points to an ancestor", .0.display())]
    LinkLoop(PathBuf),

    /// Completion bookkeeping was violated (double finish, decrement below zero, ...).
    #[error("completion tracking: {0}")]
    Tracker(String),

    /// The operation drained without its root ever completing.
    #[error("operation on {} ended before its root completed", .0.display())]
    Incomplete(PathBuf),
}

impl FsError {
    /// Wrap an I/O error for `path`. A missing root is mapped to [`FsError::NotFound`] by the walk.
    pub fn io(path: &Path, source: io::Error) -> Self {
        FsError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            FsError::NotFound(_) => true,
            FsError::Batch { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// The path this error occurred at, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            FsError::NotFound(p)
            | FsError::NotADirectory(p)
            | FsError::LinkLoop(p)
            | FsError::Incomplete(p)
            | FsError::Io { path: p, .. }
            | FsError::DestinationInsideSource { destination: p, .. } => Some(p),
            FsError::Batch { source, .. } => source.path(),
            FsError::Tracker(_) => None,
        }
    }
}
