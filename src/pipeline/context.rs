//! Shared context for one bulk operation: root, exclusions, bookkeeping state, first error and
//! the once-only completion signal. Borrowed by every task spawned on the operation's rayon scope.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::engine::tools::{is_excluded, path_relative_to};
use crate::error::FsError;

use super::error_handler::{check_for_first_error, record_first_error};

pub struct TaskContext<S> {
    pub root: PathBuf,
    pub exclude: Vec<String>,
    state: Mutex<S>,
    first_error: Mutex<Option<FsError>>,
    aborted: AtomicBool,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl<S> TaskContext<S> {
    pub fn new(root: &Path, exclude: &[String], state: S) -> Self {
        let (done_tx, done_rx) = bounded::<()>(1);
        Self {
            root: root.to_path_buf(),
            exclude: exclude.to_vec(),
            state: Mutex::new(state),
            first_error: Mutex::new(None),
            aborted: AtomicBool::new(false),
            done_tx,
            done_rx,
        }
    }

    /// Bookkeeping lock (poisoning ignored).
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True when `path` (under root) matches an exclusion.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.exclude.is_empty() {
            return false;
        }
        match path_relative_to(path, &self.root) {
            Some(rel) => is_excluded(&rel, &self.exclude),
            None => false,
        }
    }

    /// Record a fatal error; tasks that check [`Self::is_aborted`] stop issuing new work.
    pub fn fail(&self, err: FsError) {
        self.aborted.store(true, Ordering::Relaxed);
        record_first_error(&self.first_error, err);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }

    /// Signal that the root completed. A second signal is a bookkeeping defect.
    pub fn complete(&self) {
        if let Err(TrySendError::Full(()) | TrySendError::Disconnected(())) =
            self.done_tx.try_send(())
        {
            self.fail(FsError::Tracker(format!(
                "{} completed twice",
                self.root.display()
            )));
        }
    }

    /// Consume the context after its scope has joined: the first error if any, otherwise the
    /// final state if the root completed.
    pub fn finish(self) -> Result<S, FsError> {
        check_for_first_error(&self.first_error)?;
        if self.done_rx.try_recv().is_err() {
            return Err(FsError::Incomplete(self.root));
        }
        Ok(self.state.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}
