//! Public and internal types for the fsbulk API and pipeline.

use serde::Serialize;
use serde::ser::{SerializeTuple, Serializer};
use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::engine::tools::commas;

/// Kind of an [`Entry`]. Devices are reported as `File`; links only appear when the walk is
/// link-aware.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Link,
}

impl EntryKind {
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }
}

/// Stat data kept for each entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EntryMeta {
    /// Size in bytes (as reported by stat; directories report the fs-specific value).
    pub size: u64,
    /// Modification time in nanoseconds since epoch.
    pub mtime_ns: i64,
    /// Access time in nanoseconds since epoch.
    pub atime_ns: i64,
    /// Permission bits.
    pub mode: u32,
}

fn time_ns(t: io::Result<SystemTime>) -> i64 {
    match t.map(|t| t.duration_since(UNIX_EPOCH)) {
        Ok(Ok(d)) => d.as_nanos() as i64,
        Ok(Err(before_epoch)) => -(before_epoch.duration().as_nanos() as i64),
        Err(_) => 0,
    }
}

#[cfg(unix)]
fn mode_of(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn mode_of(meta: &Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}

impl From<&Metadata> for EntryMeta {
    fn from(meta: &Metadata) -> Self {
        EntryMeta {
            size: meta.len(),
            mtime_ns: time_ns(meta.modified()),
            atime_ns: time_ns(meta.accessed()),
            mode: mode_of(meta),
        }
    }
}

/// One filesystem object discovered during a walk.
///
/// `parent_index` points at the containing directory's entry; the root points at itself (0).
/// `pending_children` is the number of direct children present in the collection and is only
/// non-zero for directories. Consumers seed [`CompletionTracker`](crate::pipeline::CompletionTracker)
/// from it.
#[derive(Clone, Debug)]
pub struct Entry {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub parent_index: usize,
    pub pending_children: usize,
    pub meta: EntryMeta,
}

/// Serialized as `[path, kind, parent_index, pending_children, meta]` for machine consumption.
impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(5)?;
        tup.serialize_element(&self.path.to_string_lossy())?;
        tup.serialize_element(&self.kind)?;
        tup.serialize_element(&self.parent_index)?;
        tup.serialize_element(&self.pending_children)?;
        tup.serialize_element(&self.meta)?;
        tup.end()
    }
}

/// Result of a classify query on a single path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PathKind {
    File,
    Directory,
    SymbolicLink,
    BlockDevice,
    CharacterDevice,
    Fifo,
    Socket,
    Unknown,
    Missing,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PathKind::File => "file",
            PathKind::Directory => "directory",
            PathKind::SymbolicLink => "symbolicLink",
            PathKind::BlockDevice => "blockDevice",
            PathKind::CharacterDevice => "characterDevice",
            PathKind::Fifo => "FIFO",
            PathKind::Socket => "socket",
            PathKind::Unknown => "unknown",
            PathKind::Missing => "missing",
        };
        f.write_str(s)
    }
}

/// Counts collected by copy and remove.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files: u64,
    pub directories: u64,
    pub links: u64,
    pub bytes: u64,
}

impl Summary {
    pub fn count(&mut self, kind: EntryKind, size: u64) {
        match kind {
            EntryKind::File => {
                self.files += 1;
                self.bytes += size;
            }
            EntryKind::Directory => self.directories += 1,
            EntryKind::Link => self.links += 1,
        }
    }
}

/// `2 directories, 1 file, and 0 symbolic links at 1,024 bytes.`
impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: u64, one: &'static str, many: &'static str| if n == 1 { one } else { many };
        write!(
            f,
            "{} {}, {} {}, and {} {} at {} bytes.",
            self.directories,
            plural(self.directories, "directory", "directories"),
            self.files,
            plural(self.files, "file", "files"),
            self.links,
            plural(self.links, "symbolic link", "symbolic links"),
            commas(self.bytes)
        )
    }
}

/// Contents returned by the safe file reader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileContents {
    Text(String),
    Binary(Vec<u8>),
}

impl FileContents {
    pub fn is_binary(&self) -> bool {
        matches!(self, FileContents::Binary(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContents::Text(s) => s.as_bytes(),
            FileContents::Binary(b) => b,
        }
    }
}

/// Options for [`enumerate`](crate::pipeline::enumerate).
#[derive(Clone, Debug)]
pub struct WalkOpts {
    /// Root-relative paths to skip (matched component-wise against the whole relative path).
    pub exclude: Vec<String>,
    /// Descend below the first directory level.
    pub recursive: bool,
    /// Report symbolic links as links (lstat) instead of following them (stat).
    pub symbolic: bool,
}

impl Default for WalkOpts {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            recursive: true,
            symbolic: false,
        }
    }
}

/// Options for [`copy_tree`](crate::engine::copy_tree).
#[derive(Clone, Debug, Default)]
pub struct CopyOpts {
    /// Source-relative paths to skip.
    pub exclude: Vec<String>,
}

/// Options for [`hash_path`](crate::engine::hash_path).
#[derive(Clone, Debug, Default)]
pub struct HashOpts {
    /// Root-relative paths to skip.
    pub exclude: Vec<String>,
    /// Override the batch size derived from the descriptor limit.
    pub batch_size: Option<usize>,
}

/// Full options used by the CLI (file config + flags merged).
#[derive(Clone, Debug, Default)]
pub struct Opts {
    pub exclude: Vec<String>,
    pub verbose: bool,
    pub debug: bool,
    pub symbolic: bool,
}
