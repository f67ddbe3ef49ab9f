//! Tree fingerprints.
//!
//! Files are digested by content; directories and links by their path string. The tree
//! digest sorts entries by path, concatenates their hex digests in that order and digests the
//! result, so it depends only on tree shape and content. File hashing runs in sequential
//! batches sized from the open-file limit so large trees cannot exhaust descriptors.

use anyhow::bail;
use log::debug;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use crate::error::FsError;
use crate::pipeline::{CompletionTracker, TaskContext, enumerate};
use crate::utils::fd_limit::{FD_BATCH_DIVISOR, max_open_fds};
use crate::{Entry, EntryKind, HashOpts, WalkOpts};

use super::hashing::{Digest, hash_file, hash_reader, hash_str, to_hex};

/// Progress callback: `(entries just finished, total entries)`.
pub type OnProgress<'a> = &'a (dyn Fn(usize, usize) + Sync);

/// Every scanned entry with its digest, in discovery order.
pub struct TreeDigest {
    entries: Vec<Entry>,
    digests: Vec<Digest>,
}

impl TreeDigest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indices of entries ordered by path.
    fn sorted(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by(|&a, &b| self.entries[a].path.cmp(&self.entries[b].path));
        order
    }

    /// Single fingerprint. A lone file yields its content digest; anything else the digest of
    /// the path-sorted concatenation of every entry's hex digest.
    pub fn aggregate(&self) -> String {
        if let [only] = self.entries.as_slice()
            && only.kind == EntryKind::File
        {
            return to_hex(&self.digests[0]);
        }
        let joined: String = self
            .sorted()
            .into_iter()
            .map(|i| to_hex(&self.digests[i]))
            .collect();
        to_hex(&hash_str(&joined))
    }

    /// Path -> hex digest for every entry.
    pub fn into_list(self) -> BTreeMap<String, String> {
        self.entries
            .into_iter()
            .zip(self.digests)
            .map(|(e, d)| (e.path.to_string_lossy().into_owned(), to_hex(&d)))
            .collect()
    }
}

/// Fingerprint of a file or a whole tree, as 128 hex characters.
pub fn hash_path(path: &Path, opts: &HashOpts) -> crate::Result<String> {
    Ok(hash_tree(path, opts, None)?.aggregate())
}

/// Per-entry fingerprints keyed by path.
pub fn hash_list(path: &Path, opts: &HashOpts) -> crate::Result<BTreeMap<String, String>> {
    Ok(hash_tree(path, opts, None)?.into_list())
}

/// Fingerprint of a string value.
pub fn hash_string(value: &str) -> String {
    to_hex(&hash_str(value))
}

/// Fingerprint of any byte stream (e.g. a resource obtained elsewhere).
pub fn hash_stream<R: Read>(reader: R) -> crate::Result<String> {
    Ok(to_hex(&hash_reader(reader)?))
}

/// Batch size for `files` leaves under descriptor `limit`: a fifth of the limit once the
/// tree reaches it, otherwise everything at once.
pub fn batch_size_for(files: usize, limit: Option<u64>) -> usize {
    match limit {
        Some(limit) if files as u64 >= limit => limit.div_ceil(FD_BATCH_DIVISOR).max(1) as usize,
        _ => files.max(1),
    }
}

struct HashState {
    tracker: CompletionTracker,
    digests: Vec<Option<Digest>>,
    /// Files digested so far.
    completed: usize,
}

impl HashState {
    /// Store a digest; leaves (and empty directories) finish and cascade.
    fn record(&mut self, entries: &[Entry], idx: usize, digest: Digest) -> Result<bool, FsError> {
        self.digests[idx] = Some(digest);
        let e = &entries[idx];
        if e.kind == EntryKind::File {
            self.completed += 1;
        }
        if e.kind.is_dir() && e.pending_children > 0 {
            return Ok(false);
        }
        self.tracker.finish_cascade(idx)
    }
}

type HashContext = TaskContext<HashState>;

/// Walk `path` (links not followed, exclusions honoured) and digest every entry.
pub fn hash_tree(
    path: &Path,
    opts: &HashOpts,
    on_progress: Option<OnProgress<'_>>,
) -> crate::Result<TreeDigest> {
    let walk_opts = WalkOpts {
        exclude: opts.exclude.clone(),
        recursive: true,
        symbolic: true,
    };
    let walk = enumerate(path, &walk_opts)?;
    let root = walk.root().to_path_buf();
    let entries = walk.into_entries();
    if entries.is_empty() {
        bail!("{} is not a file or directory", root.display());
    }
    debug!(
        "analyzed {}: {} file system objects",
        root.display(),
        entries.len()
    );

    let state = HashState {
        tracker: CompletionTracker::from_entries(&entries),
        digests: vec![None; entries.len()],
        completed: 0,
    };
    let ctx = HashContext::new(&root, &[], state);
    let total = entries.len();
    let report = |n: usize| {
        if let Some(cb) = on_progress {
            cb(n, total);
        }
    };

    // Directories and links need no I/O: their digests are taken up front.
    let mut files = Vec::new();
    for (idx, e) in entries.iter().enumerate() {
        if e.kind == EntryKind::File {
            files.push(idx);
            continue;
        }
        let digest = hash_str(&e.path.to_string_lossy());
        if ctx.lock().record(&entries, idx, digest)? {
            ctx.complete();
        }
        report(1);
    }

    let batch = opts
        .batch_size
        .unwrap_or_else(|| batch_size_for(files.len(), max_open_fds()));
    if batch < files.len() {
        debug!(
            "descriptor limit: hashing {} files {} at a time",
            files.len(),
            batch
        );
    }
    for chunk in files.chunks(batch.max(1)) {
        if ctx.is_aborted() {
            break;
        }
        chunk.par_iter().for_each(|&idx| {
            if ctx.is_aborted() {
                return;
            }
            let e = &entries[idx];
            let result = hash_file(&e.path, e.meta.size);
            let mut state = ctx.lock();
            let outcome = match result {
                Ok(digest) => state.record(&entries, idx, digest),
                Err(err) => Err(FsError::Batch {
                    completed: state.completed,
                    source: Box::new(err),
                }),
            };
            drop(state);
            match outcome {
                Ok(true) => ctx.complete(),
                Ok(false) => {}
                Err(err) => ctx.fail(err),
            }
            report(1);
        });
    }

    let state = ctx.finish()?;
    let digests = state
        .digests
        .into_iter()
        .collect::<Option<Vec<Digest>>>()
        .ok_or_else(|| FsError::Incomplete(root.clone()))?;
    Ok(TreeDigest { entries, digests })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_for() {
        assert_eq!(batch_size_for(10, None), 10);
        assert_eq!(batch_size_for(0, None), 1);
        assert_eq!(batch_size_for(10, Some(1024)), 10);
        assert_eq!(batch_size_for(2000, Some(1024)), 205);
        assert_eq!(batch_size_for(3, Some(3)), 1);
    }

    #[test]
    fn test_hash_string_is_stable() {
        assert_eq!(hash_string("abc"), hash_string("abc"));
        assert_ne!(hash_string("abc"), hash_string("abd"));
        assert_eq!(hash_string("abc").len(), 128);
    }

    #[test]
    fn test_batches_do_not_change_digest() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("d/e")).unwrap();
        for (i, f) in ["1", "d/2", "d/e/3", "d/e/4", "5"].iter().enumerate() {
            std::fs::write(tmp.path().join(f), vec![i as u8; i * 7]).unwrap();
        }
        let whole = hash_path(tmp.path(), &HashOpts::default()).unwrap();
        let batched = hash_path(
            tmp.path(),
            &HashOpts {
                batch_size: Some(2),
                ..HashOpts::default()
            },
        )
        .unwrap();
        assert_eq!(whole, batched);
    }

    #[test]
    fn test_file_vanishing_mid_run_reports_completed_files() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("R");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("a"), "a").unwrap();
        std::fs::write(root.join("b"), "b").unwrap();

        // Call 1 is the root directory, call 2 the first file; then both files go away.
        let calls = AtomicUsize::new(0);
        let on_progress = |_: usize, _: usize| {
            if calls.fetch_add(1, Ordering::SeqCst) == 1 {
                let _ = std::fs::remove_file(root.join("a"));
                let _ = std::fs::remove_file(root.join("b"));
            }
        };
        let opts = HashOpts {
            batch_size: Some(1),
            ..HashOpts::default()
        };
        let progress: OnProgress<'_> = &on_progress;
        let err = hash_tree(&root, &opts, Some(progress)).err().unwrap();
        match err.downcast_ref::<FsError>() {
            Some(FsError::Batch { completed, source }) => {
                assert_eq!(*completed, 1);
                assert!(matches!(
                    source.as_ref(),
                    FsError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "failed after 1 files");
    }

    #[test]
    fn test_single_file_is_content_digest() {
        let tmp = tempfile::tempdir().unwrap();
        let f = tmp.path().join("f");
        std::fs::write(&f, "content").unwrap();
        assert_eq!(
            hash_path(&f, &HashOpts::default()).unwrap(),
            hash_stream(&b"content"[..]).unwrap()
        );
    }
}
