use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Bulk file system operations: walk, copy, remove and hash whole trees concurrently.
#[derive(Clone, Parser)]
#[command(name = "fsbulk", version)]
#[command(about = "Walk, copy, remove and hash directory trees concurrently.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Flags accepted by every command. Unset flags fall back to `.fsbulk.toml`, then to off.
#[derive(Clone, Debug, Args)]
pub struct GlobalArgs {
    /// Verbose output (debug logging, progress bars, trailers).
    #[arg(long, short = 'v', global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// On failure print a full report: error chain, stack trace, environment.
    #[arg(long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub debug: Option<bool>,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// List a file system tree as JSON.
    Directory {
        path: PathBuf,

        /// Do not descend below the first directory level.
        #[arg(long)]
        shallow: bool,

        /// Report symbolic links as links instead of following them.
        #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
        symbolic: Option<bool>,

        /// Print only the sorted list of paths.
        #[arg(long)]
        list_only: bool,

        /// Print only what kind of object PATH is.
        #[arg(long = "typeof")]
        type_of: bool,

        /// Root-relative paths to skip. Can specify multiple: -e a b/c
        #[arg(long, short = 'e', alias = "ignore", num_args = 1..)]
        exclude: Vec<String>,
    },

    /// Copy a file or the contents of a directory into DESTINATION.
    Copy {
        source: PathBuf,
        destination: PathBuf,

        /// Source-relative paths to skip.
        #[arg(long, short = 'e', alias = "ignore", num_args = 1..)]
        exclude: Vec<String>,
    },

    /// Remove a file or directory tree.
    Remove { path: PathBuf },

    /// Hash a file, a directory tree, or (with --string) a literal value.
    Hash {
        #[arg(value_name = "PATH|STRING")]
        target: String,

        /// Print a JSON map of path to digest instead of one digest.
        #[arg(long)]
        list: bool,

        /// Hash TARGET itself rather than the file it names.
        #[arg(long)]
        string: bool,

        /// Root-relative paths to skip.
        #[arg(long, short = 'e', alias = "ignore", num_args = 1..)]
        exclude: Vec<String>,
    },

    /// Print a file as text, or its size if it is binary.
    Read { path: PathBuf },
}

impl Commands {
    /// Exclusions given on the command line, if the command takes any.
    pub fn exclude(&self) -> &[String] {
        match self {
            Commands::Directory { exclude, .. }
            | Commands::Copy { exclude, .. }
            | Commands::Hash { exclude, .. } => exclude,
            Commands::Remove { .. } | Commands::Read { .. } => &[],
        }
    }
}
