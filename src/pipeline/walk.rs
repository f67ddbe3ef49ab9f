//! Concurrent tree walk: one rayon task per discovered node, termination detected by the
//! completion tracker rather than by counting outstanding tasks.
//!
//! A directory is registered with its child count before any child task is spawned. Every
//! child that finishes (or is skipped) decrements its parent; a directory reaching zero
//! finishes in turn, and the root finishing delivers the collection exactly once.

use log::debug;
use rayon::Scope;
use std::collections::HashMap;
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::engine::tools::{resolve_path, stat_path};
use crate::error::FsError;
use crate::{Entry, EntryKind, EntryMeta, WalkOpts};

use super::completion::CompletionTracker;
use super::context::TaskContext;

/// Result of [`enumerate`]: the entry collection of one walk.
#[derive(Debug)]
pub struct Walk {
    root: PathBuf,
    entries: Vec<Entry>,
}

impl Walk {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// List-only view: every path, sorted.
    pub fn into_paths(self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.entries.into_iter().map(|e| e.path).collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes of file entries.
    pub fn total_size(&self) -> u64 {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::File)
            .map(|e| e.meta.size)
            .sum()
    }
}

/// Device/inode pair used to spot directory links that lead back to an ancestor.
type NodeId = (u64, u64);

#[cfg(unix)]
fn node_id(meta: &Metadata) -> Option<NodeId> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn node_id(_meta: &Metadata) -> Option<NodeId> {
    None
}

#[derive(Default)]
struct WalkState {
    entries: Vec<Entry>,
    tracker: CompletionTracker,
    dir_ids: HashMap<usize, NodeId>,
}

impl WalkState {
    /// Append an entry and its tracker slot (same index).
    fn push(&mut self, entry: Entry, parent: Option<usize>) -> usize {
        let children = entry.pending_children;
        self.entries.push(entry);
        self.tracker.register(parent, children)
    }

    /// True if a directory with `id` is `parent` or one of its ancestors.
    fn revisits_ancestor(&self, parent: Option<usize>, id: NodeId) -> bool {
        let mut cur = parent;
        while let Some(idx) = cur {
            if self.dir_ids.get(&idx) == Some(&id) {
                return true;
            }
            cur = self.tracker.parent(idx);
        }
        false
    }
}

type WalkContext = TaskContext<WalkState>;

/// Walk `root` and return every entry below it (the root included).
///
/// A missing root is [`FsError::NotFound`]; any other I/O failure aborts the walk and is
/// returned without partial results.
pub fn enumerate(root: &Path, opts: &WalkOpts) -> crate::Result<Walk> {
    let root = resolve_path(root)?;
    let meta = match stat_path(&root, opts.symbolic) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(FsError::NotFound(root).into());
        }
        Err(e) => return Err(FsError::io(&root, e).into()),
    };

    let ctx = WalkContext::new(&root, &opts.exclude, WalkState::default());
    rayon::scope(|s| {
        if let Err(e) = visit(s, &ctx, opts, root.clone(), None, Some(meta)) {
            ctx.fail(e);
        }
    });
    let state = ctx.finish()?;
    debug!("walked {}: {} entries", root.display(), state.entries.len());
    Ok(Walk {
        root,
        entries: state.entries,
    })
}

/// List-only walk: sorted paths, no entry collection kept by the caller.
pub fn list_paths(root: &Path, opts: &WalkOpts) -> crate::Result<Vec<PathBuf>> {
    Ok(enumerate(root, opts)?.into_paths())
}

fn spawn_child<'s>(
    s: &Scope<'s>,
    ctx: &'s WalkContext,
    opts: &'s WalkOpts,
    path: PathBuf,
    parent: usize,
) {
    s.spawn(move |s| {
        if let Err(e) = visit(s, ctx, opts, path, Some(parent), None) {
            ctx.fail(e);
        }
    });
}

/// Hand the collection over once the root finished.
fn deliver(ctx: &WalkContext, root_done: bool) {
    if root_done {
        ctx.complete();
    }
}

/// Drop a child that will not get an entry; it counts as already complete.
fn skip_child(ctx: &WalkContext, parent: usize) -> Result<(), FsError> {
    let mut state = ctx.lock();
    let ready = state.tracker.release(parent)?;
    if let Some(dir) = state.entries.get_mut(parent) {
        dir.pending_children = dir.pending_children.saturating_sub(1);
    }
    let root_done = if ready {
        state.tracker.finish_cascade(parent)?
    } else {
        false
    };
    drop(state);
    deliver(ctx, root_done);
    Ok(())
}

/// Push a childless entry and finish it immediately.
fn push_leaf(
    ctx: &WalkContext,
    path: PathBuf,
    kind: EntryKind,
    parent: Option<usize>,
    meta: &Metadata,
) -> Result<(), FsError> {
    let mut state = ctx.lock();
    let idx = state.push(
        Entry {
            path,
            kind,
            parent_index: parent.unwrap_or(0),
            pending_children: 0,
            meta: EntryMeta::from(meta),
        },
        parent,
    );
    let root_done = state.tracker.finish_cascade(idx)?;
    drop(state);
    deliver(ctx, root_done);
    Ok(())
}

fn read_children(dir: &Path) -> Result<Vec<PathBuf>, FsError> {
    let mut children = Vec::new();
    for item in std::fs::read_dir(dir).map_err(|e| FsError::io(dir, e))? {
        let item = item.map_err(|e| FsError::io(dir, e))?;
        children.push(item.path());
    }
    Ok(children)
}

fn visit<'s>(
    s: &Scope<'s>,
    ctx: &'s WalkContext,
    opts: &'s WalkOpts,
    path: PathBuf,
    parent: Option<usize>,
    meta: Option<Metadata>,
) -> Result<(), FsError> {
    if ctx.is_aborted() {
        return Ok(());
    }
    if let Some(p) = parent
        && ctx.is_excluded(&path)
    {
        return skip_child(ctx, p);
    }
    let meta = match meta {
        Some(m) => m,
        None => stat_path(&path, opts.symbolic).map_err(|e| FsError::io(&path, e))?,
    };
    let ft = meta.file_type();

    if ft.is_dir() {
        if parent.is_some() && !opts.recursive {
            return push_leaf(ctx, path, EntryKind::Directory, parent, &meta);
        }
        let children = read_children(&path)?;
        let mut state = ctx.lock();
        if !opts.symbolic
            && let Some(id) = node_id(&meta)
            && state.revisits_ancestor(parent, id)
        {
            return Err(FsError::LinkLoop(path));
        }
        let idx = state.push(
            Entry {
                path,
                kind: EntryKind::Directory,
                parent_index: parent.unwrap_or(0),
                pending_children: children.len(),
                meta: EntryMeta::from(&meta),
            },
            parent,
        );
        if let Some(id) = node_id(&meta) {
            state.dir_ids.insert(idx, id);
        }
        if children.is_empty() {
            let root_done = state.tracker.finish_cascade(idx)?;
            drop(state);
            deliver(ctx, root_done);
            return Ok(());
        }
        drop(state);
        for child in children {
            spawn_child(s, ctx, opts, child, idx);
        }
        return Ok(());
    }

    if ft.is_symlink() {
        return push_leaf(ctx, path, EntryKind::Link, parent, &meta);
    }
    if ft.is_file() || is_device(&ft) {
        return push_leaf(ctx, path, EntryKind::File, parent, &meta);
    }

    debug!("skipping unsupported file type: {}", path.display());
    match parent {
        Some(p) => skip_child(ctx, p),
        None => {
            // Unsupported root: an empty, complete collection.
            ctx.complete();
            Ok(())
        }
    }
}

#[cfg(unix)]
fn is_device(ft: &std::fs::FileType) -> bool {
    use std::os::unix::fs::FileTypeExt;
    ft.is_block_device() || ft.is_char_device()
}

#[cfg(not(unix))]
fn is_device(_ft: &std::fs::FileType) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn opts() -> WalkOpts {
        WalkOpts::default()
    }

    #[test]
    fn test_parent_index_never_forward() {
        let tmp = tempfile::tempdir().unwrap();
        for d in ["a/b/c", "a/d", "e"] {
            fs::create_dir_all(tmp.path().join(d)).unwrap();
        }
        for f in ["a/b/c/1.txt", "a/2.txt", "e/3.txt", "4.txt"] {
            fs::write(tmp.path().join(f), "x").unwrap();
        }
        let walk = enumerate(tmp.path(), &opts()).unwrap();
        assert_eq!(walk.len(), 10);
        for (i, e) in walk.entries().iter().enumerate().skip(1) {
            assert!(e.parent_index < i, "{} points forward", e.path.display());
            let parent = &walk.entries()[e.parent_index];
            assert_eq!(e.path.parent(), Some(parent.path.as_path()));
        }
    }

    #[test]
    fn test_pending_children_counts_direct_children() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/x"), "1").unwrap();
        fs::write(tmp.path().join("sub/y"), "2").unwrap();
        fs::write(tmp.path().join("z"), "3").unwrap();
        let walk = enumerate(tmp.path(), &opts()).unwrap();
        let root = &walk.entries()[0];
        assert_eq!(root.kind, EntryKind::Directory);
        assert_eq!(root.pending_children, 2);
        let sub = walk
            .entries()
            .iter()
            .find(|e| e.path.ends_with("sub"))
            .unwrap();
        assert_eq!(sub.pending_children, 2);
    }

    #[test]
    fn test_shallow_stops_after_first_level() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::write(tmp.path().join("a/b/deep.txt"), "x").unwrap();
        fs::write(tmp.path().join("top.txt"), "x").unwrap();
        let shallow = WalkOpts {
            recursive: false,
            ..opts()
        };
        let paths = list_paths(tmp.path(), &shallow).unwrap();
        let root = resolve_path(tmp.path()).unwrap();
        assert_eq!(paths, vec![root.clone(), root.join("a"), root.join("top.txt")]);
    }

    #[test]
    fn test_excluded_child_releases_parent() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("skip/inner")).unwrap();
        fs::write(tmp.path().join("keep.txt"), "x").unwrap();
        let ex = WalkOpts {
            exclude: vec!["skip".into()],
            ..opts()
        };
        let walk = enumerate(tmp.path(), &ex).unwrap();
        assert_eq!(walk.len(), 2);
        assert_eq!(walk.entries()[0].pending_children, 1);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = enumerate(&tmp.path().join("nope"), &opts()).unwrap_err();
        let fs_err = err.downcast_ref::<FsError>().unwrap();
        assert!(fs_err.is_not_found());
    }

    #[cfg(unix)]
    #[test]
    fn test_followed_link_loop_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        std::os::unix::fs::symlink(tmp.path(), tmp.path().join("a/up")).unwrap();
        let err = enumerate(tmp.path(), &opts()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FsError>(),
            Some(FsError::LinkLoop(_))
        ));
        let symbolic = WalkOpts {
            symbolic: true,
            ..opts()
        };
        let walk = enumerate(tmp.path(), &symbolic).unwrap();
        assert!(walk.entries().iter().any(|e| e.kind == EntryKind::Link));
    }
}
