//! Recursive copy. Enumeration and materialisation are interleaved: a directory is created as
//! soon as it is discovered and its children are scheduled only afterwards, so every write
//! lands in a directory that already exists.

use filetime::FileTime;
use log::{debug, warn};
use rayon::Scope;
use std::fs::{File, Metadata};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use crate::engine::tools::resolve_path;
use crate::error::FsError;
use crate::pipeline::{CompletionTracker, TaskContext};
use crate::{CopyOpts, EntryKind, Summary};

use super::makedir::{make_dir, make_dir_all};

#[derive(Default)]
struct CopyState {
    tracker: CompletionTracker,
    summary: Summary,
}

type CopyContext = TaskContext<CopyState>;

/// Copy `source` into `destination`.
///
/// A directory source has its contents mirrored into `destination`; a file or link source is
/// written to `destination/<name>`. `destination` and its missing ancestors are created.
/// Existing files are overwritten, existing directories reused.
pub fn copy_tree(source: &Path, destination: &Path, opts: &CopyOpts) -> crate::Result<Summary> {
    let source = resolve_path(source)?;
    let destination = resolve_path(destination)?;
    let meta = match std::fs::symlink_metadata(&source) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(FsError::NotFound(source).into());
        }
        Err(e) => return Err(FsError::io(&source, e).into()),
    };

    if meta.is_dir() && destination.starts_with(&source) {
        return Err(FsError::DestinationInsideSource {
            source_dir: source,
            destination,
        }
        .into());
    }

    make_dir_all(&destination)?;
    let target = if meta.is_dir() {
        destination.clone()
    } else {
        match source.file_name() {
            Some(name) => destination.join(name),
            None => destination.clone(),
        }
    };

    let ctx = CopyContext::new(&source, &opts.exclude, CopyState::default());
    rayon::scope(|s| {
        if let Err(e) = visit(s, &ctx, source.clone(), target, None, Some(meta)) {
            ctx.fail(e);
        }
    });
    let state = ctx.finish()?;
    debug!(
        "copied {} -> {}: {:?}",
        source.display(),
        destination.display(),
        state.summary
    );
    Ok(state.summary)
}

fn spawn_child<'s>(s: &Scope<'s>, ctx: &'s CopyContext, src: PathBuf, dst: PathBuf, parent: usize) {
    s.spawn(move |s| {
        if let Err(e) = visit(s, ctx, src, dst, Some(parent), None) {
            ctx.fail(e);
        }
    });
}

/// Register a finished leaf and cascade.
fn finish_leaf(
    ctx: &CopyContext,
    kind: EntryKind,
    size: u64,
    parent: Option<usize>,
) -> Result<(), FsError> {
    let mut state = ctx.lock();
    state.summary.count(kind, size);
    let idx = state.tracker.register(parent, 0);
    let root_done = state.tracker.finish_cascade(idx)?;
    drop(state);
    if root_done {
        ctx.complete();
    }
    Ok(())
}

fn skip_child(ctx: &CopyContext, parent: usize) -> Result<(), FsError> {
    let mut state = ctx.lock();
    let root_done = if state.tracker.release(parent)? {
        state.tracker.finish_cascade(parent)?
    } else {
        false
    };
    drop(state);
    if root_done {
        ctx.complete();
    }
    Ok(())
}

fn visit<'s>(
    s: &Scope<'s>,
    ctx: &'s CopyContext,
    src: PathBuf,
    dst: PathBuf,
    parent: Option<usize>,
    meta: Option<Metadata>,
) -> Result<(), FsError> {
    if ctx.is_aborted() {
        return Ok(());
    }
    if let Some(p) = parent
        && ctx.is_excluded(&src)
    {
        return skip_child(ctx, p);
    }
    let meta = match meta {
        Some(m) => m,
        None => std::fs::symlink_metadata(&src).map_err(|e| FsError::io(&src, e))?,
    };
    let ft = meta.file_type();

    if ft.is_dir() {
        if parent.is_some() {
            make_dir(&dst)?;
        }
        let mut children = Vec::new();
        for item in std::fs::read_dir(&src).map_err(|e| FsError::io(&src, e))? {
            let item = item.map_err(|e| FsError::io(&src, e))?;
            children.push(item.file_name());
        }

        let mut state = ctx.lock();
        if parent.is_some() {
            state.summary.count(EntryKind::Directory, 0);
        }
        let idx = state.tracker.register(parent, children.len());
        if children.is_empty() {
            let root_done = state.tracker.finish_cascade(idx)?;
            drop(state);
            if root_done {
                ctx.complete();
            }
            return Ok(());
        }
        drop(state);
        for name in children {
            spawn_child(s, ctx, src.join(&name), dst.join(&name), idx);
        }
        return Ok(());
    }

    if ft.is_symlink() {
        copy_link(&src, &dst)?;
        return finish_leaf(ctx, EntryKind::Link, 0, parent);
    }
    if ft.is_file() {
        copy_file(&src, &dst, &meta)?;
        return finish_leaf(ctx, EntryKind::File, meta.len(), parent);
    }

    warn!("not copying unsupported file type: {}", src.display());
    match parent {
        Some(p) => skip_child(ctx, p),
        None => {
            ctx.complete();
            Ok(())
        }
    }
}

/// Stream `src` into `dst`, then carry over permissions and timestamps. A failed stream
/// leaves no partial destination behind.
fn copy_file(src: &Path, dst: &Path, meta: &Metadata) -> Result<(), FsError> {
    let reader = File::open(src).map_err(|e| FsError::io(src, e))?;
    let writer = File::create(dst).map_err(|e| FsError::io(dst, e))?;
    stream_into(reader, writer, dst).map_err(|e| FsError::io(src, e))?;

    std::fs::set_permissions(dst, meta.permissions()).map_err(|e| FsError::io(dst, e))?;
    filetime::set_file_times(
        dst,
        FileTime::from_last_access_time(meta),
        FileTime::from_last_modification_time(meta),
    )
    .map_err(|e| FsError::io(dst, e))
}

/// Copy `reader` to `writer`, which was opened on `dst`. On failure the writer is closed and
/// `dst` removed.
fn stream_into<R: Read, W: Write>(mut reader: R, mut writer: W, dst: &Path) -> io::Result<()> {
    let copied = io::copy(&mut reader, &mut writer).and_then(|_| writer.flush());
    drop(writer);
    if copied.is_err()
        && let Err(cleanup) = std::fs::remove_file(dst)
    {
        debug!("could not remove partial {}: {cleanup}", dst.display());
    }
    copied
}

/// Absolute path a link at `link` points to.
fn link_target(link: &Path) -> Result<PathBuf, FsError> {
    let target = std::fs::read_link(link).map_err(|e| FsError::io(link, e))?;
    if target.is_absolute() {
        return Ok(target);
    }
    let base = link.parent().unwrap_or(Path::new(""));
    resolve_path(&base.join(target))
}

/// Recreate the link at `src` as `dst`, pointing at the resolved target. A link already at
/// `dst` is replaced.
fn copy_link(src: &Path, dst: &Path) -> Result<(), FsError> {
    let target = link_target(src)?;
    if let Ok(existing) = std::fs::symlink_metadata(dst)
        && existing.file_type().is_symlink()
    {
        std::fs::remove_file(dst).map_err(|e| FsError::io(dst, e))?;
    }
    symlink(&target, dst).map_err(|e| FsError::io(dst, e))
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(not(any(unix, windows)))]
fn symlink(_target: &Path, link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        ErrorKind::Unsupported,
        format!("symbolic links are not supported here: {}", link.display()),
    ))
}
