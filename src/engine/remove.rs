//! Recursive delete: leaves and empty directories go first, every other directory is deleted
//! by whichever child deletion brings its outstanding count to zero.

use log::{debug, warn};
use std::io::ErrorKind;
use std::path::Path;
use std::thread;

use crate::error::FsError;
use crate::pipeline::{Completion, CompletionTracker, TaskContext, enumerate};
use crate::utils::config::RemoveConsts;
use crate::{Entry, EntryKind, Summary, WalkOpts};

type RemoveContext = TaskContext<CompletionTracker>;

/// Delete `root` and everything below it. Returns what was removed.
pub fn remove_tree(root: &Path) -> crate::Result<Summary> {
    remove_tree_with(root, |_| {})
}

/// Like [`remove_tree`], calling `on_removed` for each entry right after it is deleted.
/// A directory is never passed before all of its children have been.
pub fn remove_tree_with<F>(root: &Path, on_removed: F) -> crate::Result<Summary>
where
    F: Fn(&Entry) + Sync,
{
    let opts = WalkOpts {
        exclude: Vec::new(),
        recursive: true,
        symbolic: true,
    };
    let walk = enumerate(root, &opts)?;
    let root = walk.root().to_path_buf();
    let entries = walk.into_entries();
    if entries.is_empty() {
        // Unsupported root kind (FIFO, socket): nothing to walk, unlink it directly.
        std::fs::remove_file(&root).map_err(|e| FsError::io(&root, e))?;
        return Ok(Summary::default());
    }

    // The root directory itself is not counted, only what it held.
    let mut summary = Summary::default();
    for (idx, e) in entries.iter().enumerate() {
        if idx == 0 && e.kind.is_dir() {
            continue;
        }
        summary.count(e.kind, e.meta.size);
    }

    let ctx = RemoveContext::new(&root, &[], CompletionTracker::from_entries(&entries));
    rayon::scope(|s| {
        for (idx, entry) in entries.iter().enumerate() {
            if entry.kind.is_dir() && entry.pending_children > 0 {
                continue;
            }
            let (ctx, entries, on_removed) = (&ctx, &entries, &on_removed);
            s.spawn(move |_| {
                if let Err(e) = destroy_chain(ctx, entries, idx, on_removed) {
                    ctx.fail(e);
                }
            });
        }
    });
    ctx.finish()?;
    debug!("removed {}: {:?}", root.display(), summary);
    Ok(summary)
}

/// Delete `idx`, then keep deleting each parent this deletion made ready.
fn destroy_chain<F>(
    ctx: &RemoveContext,
    entries: &[Entry],
    mut idx: usize,
    on_removed: &F,
) -> Result<(), FsError>
where
    F: Fn(&Entry) + Sync,
{
    loop {
        if ctx.is_aborted() {
            return Ok(());
        }
        ctx.lock().start(idx)?;
        let entry = &entries[idx];
        destroy(entry)?;
        on_removed(entry);
        let completion = ctx.lock().finish(idx)?;
        match completion {
            Completion::Root => {
                ctx.complete();
                return Ok(());
            }
            Completion::ParentReady(parent) => idx = parent,
            Completion::Pending => return Ok(()),
        }
    }
}

/// Delete one entry. Already gone counts as success; a directory that is refilled between
/// its last child deletion and `rmdir` is retried.
fn destroy(entry: &Entry) -> Result<(), FsError> {
    let path = entry.path.as_path();
    let result = match entry.kind {
        EntryKind::Directory => remove_dir_retrying(path),
        EntryKind::File => std::fs::remove_file(path),
        EntryKind::Link => remove_link(path),
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("already gone: {}", path.display());
            Ok(())
        }
        Err(e) => Err(FsError::io(path, e)),
    }
}

fn remove_dir_retrying(path: &Path) -> std::io::Result<()> {
    let mut attempt = 0;
    loop {
        match std::fs::remove_dir(path) {
            Err(e) if e.kind() == ErrorKind::DirectoryNotEmpty
                && attempt < RemoveConsts::NOT_EMPTY_RETRIES =>
            {
                attempt += 1;
                warn!("{} is not empty, retrying ({attempt})", path.display());
                thread::sleep(RemoveConsts::NOT_EMPTY_BACKOFF * attempt);
            }
            other => return other,
        }
    }
}

#[cfg(not(windows))]
fn remove_link(path: &Path) -> std::io::Result<()> {
    std::fs::remove_file(path)
}

/// Directory links on Windows are removed as directories.
#[cfg(windows)]
fn remove_link(path: &Path) -> std::io::Result<()> {
    std::fs::remove_file(path).or_else(|_| std::fs::remove_dir(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[test]
    fn test_not_empty_directory_is_retried() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("d");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("late"), "x").unwrap();

        // Emptied after the first attempt has already failed.
        let straggler = dir.join("late");
        let emptier = thread::spawn(move || {
            thread::sleep(RemoveConsts::NOT_EMPTY_BACKOFF / 2);
            std::fs::remove_file(straggler).unwrap();
        });
        remove_dir_retrying(&dir).unwrap();
        emptier.join().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_not_empty_directory_gives_up() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("d");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("stays"), "x").unwrap();

        let err = remove_dir_retrying(&dir).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DirectoryNotEmpty);
        assert!(dir.join("stays").exists());
    }

    #[test]
    fn test_remove_dir_and_empty_subdir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("r");
        std::fs::create_dir_all(root.join("b")).unwrap();
        std::fs::write(root.join("a.txt"), "hi").unwrap();

        let summary = remove_tree(&root).unwrap();
        assert_eq!(summary.directories, 1);
        assert_eq!(summary.files, 1);
        assert_eq!(summary.links, 0);
        assert_eq!(summary.bytes, 2);
        assert!(!root.exists());
    }

    #[test]
    fn test_children_removed_before_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("r");
        for d in ["x/y/z", "x/w", "v"] {
            std::fs::create_dir_all(root.join(d)).unwrap();
        }
        for f in ["x/y/z/1", "x/y/2", "x/w/3", "4", "v/5"] {
            std::fs::write(root.join(f), f).unwrap();
        }

        let order: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
        remove_tree_with(&root, |e| order.lock().unwrap().push(e.path.clone())).unwrap();
        let order = order.into_inner().unwrap();
        let pos: HashMap<&PathBuf, usize> = order.iter().enumerate().map(|(i, p)| (p, i)).collect();
        assert_eq!(order.len(), 11);
        for p in &order {
            if let Some(parent) = p.parent()
                && let Some(&parent_pos) = pos.get(&parent.to_path_buf())
            {
                assert!(pos[p] < parent_pos, "{} removed after its parent", p.display());
            }
        }
        assert_eq!(order.last(), Some(&std::path::absolute(&root).unwrap()));
    }

    #[test]
    fn test_remove_single_file() {
        let tmp = tempfile::tempdir().unwrap();
        let f = tmp.path().join("only");
        std::fs::write(&f, "12345").unwrap();
        let summary = remove_tree(&f).unwrap();
        assert_eq!(summary.files, 1);
        assert_eq!(summary.bytes, 5);
        assert!(!f.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_links_removed_not_followed() {
        let tmp = tempfile::tempdir().unwrap();
        let keep = tmp.path().join("keep");
        std::fs::create_dir(&keep).unwrap();
        std::fs::write(keep.join("precious"), "x").unwrap();
        let root = tmp.path().join("r");
        std::fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(&keep, root.join("to_keep")).unwrap();

        let summary = remove_tree(&root).unwrap();
        assert_eq!(summary.links, 1);
        assert!(!root.exists());
        assert!(keep.join("precious").exists());
    }

    #[test]
    fn test_remove_missing_root_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = remove_tree(&tmp.path().join("gone")).unwrap_err();
        assert!(err.downcast_ref::<FsError>().unwrap().is_not_found());
    }
}
