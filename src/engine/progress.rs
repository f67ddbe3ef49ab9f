//! Progress bar utilities for displaying processing status

use kdam::{Animation, Bar, BarExt};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A bar shared by parallel workers. Increments that arrive while another worker holds the
/// bar are parked in `pending` and applied by the next worker that gets it.
pub struct Progress {
    bar: Mutex<Bar>,
    pending: AtomicUsize,
}

/// Create a progress bar over `total` entries.
pub fn create_progress_bar(total: usize, desc: &'static str) -> Progress {
    Progress {
        bar: Mutex::new(kdam::tqdm!(
            total = total,
            desc = desc,
            animation = Animation::Classic,
            unit = " entries"
        )),
        pending: AtomicUsize::new(0),
    }
}

/// Advance the bar by `n` without blocking.
pub fn update_progress_bar(pb: &Progress, n: usize) {
    pb.pending.fetch_add(n, Ordering::Relaxed);
    if let Ok(mut bar) = pb.bar.try_lock() {
        let n = pb.pending.swap(0, Ordering::Relaxed);
        if n > 0 {
            let _ = bar.update(n);
        }
    }
}

/// Jump to the total and end the line.
pub fn finish_progress_bar(pb: &Progress) {
    if let Ok(mut bar) = pb.bar.lock() {
        pb.pending.store(0, Ordering::Relaxed);
        let total = bar.total;
        let _ = bar.update_to(total);
        eprintln!();
    }
}
