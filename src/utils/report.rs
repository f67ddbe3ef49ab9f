//! Top-level error sink for the CLI: a one-line message by default, a full diagnostic report
//! (error chain, backtrace, environment, command line, elapsed time) with `--debug`.

use colored::Colorize;
use std::backtrace::Backtrace;
use std::fmt::Write as _;
use std::time::Duration;
use sysinfo::System;

use crate::engine::tools::commas;

/// The message and every `caused by` beneath it.
pub fn format_concise(err: &anyhow::Error) -> String {
    let mut out = format!("{} {}", "Error:".red().bold(), err);
    for cause in err.chain().skip(1) {
        let _ = write!(out, "\n  {} {}", "caused by:".yellow(), cause);
    }
    out
}

/// Host details for the debug report.
fn environment() -> String {
    let mut sys = System::new();
    sys.refresh_memory();
    let os = System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string());
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    format!(
        "os: {os} ({})\ncpus: {cpus}\nmemory: {} bytes free of {} bytes",
        std::env::consts::ARCH,
        commas(sys.available_memory()),
        commas(sys.total_memory())
    )
}

pub fn format_debug(err: &anyhow::Error, elapsed: Duration) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Error Message".red().bold());
    let _ = writeln!(out, "{}", format_concise(err));
    let _ = writeln!(out, "\n{}", "Stack Trace".cyan().bold());
    let _ = writeln!(out, "{}", Backtrace::force_capture());
    let _ = writeln!(out, "{}", "Environment".cyan().bold());
    let _ = writeln!(out, "{}", environment());
    let args: Vec<String> = std::env::args().collect();
    let _ = writeln!(out, "command: {}", args.join(" "));
    let _ = write!(out, "elapsed: {:.3}s", elapsed.as_secs_f64());
    out
}

/// Print `err` to stderr in the form selected by `debug`.
pub fn report_error(err: &anyhow::Error, debug: bool, elapsed: Duration) {
    if debug {
        eprintln!("{}", format_debug(err, elapsed));
    } else {
        eprintln!("{}", format_concise(err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FsError;
    use std::path::Path;

    #[test]
    fn test_concise_lists_causes() {
        colored::control::set_override(false);
        let inner = FsError::io(
            Path::new("/x"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let err = anyhow::Error::new(FsError::Batch {
            completed: 3,
            source: Box::new(inner),
        });
        let text = format_concise(&err);
        assert!(text.starts_with("Error: failed after 3 files"));
        assert!(text.contains("caused by:"));
        assert!(text.contains("denied"));
    }

    #[test]
    fn test_debug_report_sections() {
        colored::control::set_override(false);
        let err = anyhow::anyhow!("boom");
        let text = format_debug(&err, Duration::from_millis(1500));
        for section in ["Error Message", "Stack Trace", "Environment", "command:", "elapsed: 1.500s"] {
            assert!(text.contains(section), "missing {section}");
        }
    }
}
