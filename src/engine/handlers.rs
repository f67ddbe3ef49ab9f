//! Command handlers: merge options, run one operation, print its result.

use anyhow::{Context, Result};
use log::{debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::engine::arg_parser::{Cli, Commands};
use crate::engine::digest::{OnProgress, hash_string, hash_tree};
use crate::engine::progress::{
    Progress, create_progress_bar, finish_progress_bar, update_progress_bar,
};
use crate::engine::tools::commas;
use crate::engine::{copy_tree, read_file, remove_tree};
use crate::pipeline::{classify, enumerate};
use crate::utils::Colors;
use crate::utils::config::PROGRESS_MIN_ENTRIES;
use crate::utils::fsbulk_toml::{apply_file_to_opts, load_fsbulk_toml};
use crate::{CopyOpts, FileContents, HashOpts, Opts, WalkOpts};

/// Options for this run: `.fsbulk.toml` in the working directory first, then CLI flags.
pub fn resolve_opts(cli: &Cli) -> Opts {
    let mut opts = Opts::default();
    if let Ok(cwd) = std::env::current_dir()
        && let Some(file) = load_fsbulk_toml(&cwd)
    {
        apply_file_to_opts(&file, &mut opts);
    }
    apply_cli_to_opts(cli, &mut opts);
    opts
}

fn apply_cli_to_opts(cli: &Cli, opts: &mut Opts) {
    if let Some(v) = cli.global.verbose {
        opts.verbose = v;
    }
    if let Some(v) = cli.global.debug {
        opts.debug = v;
    }
    if let Commands::Directory {
        symbolic: Some(v), ..
    } = cli.command
    {
        opts.symbolic = v;
    }
    let exclude = cli.command.exclude();
    if !exclude.is_empty() {
        opts.exclude = exclude.to_vec();
    }
}

/// Dispatch one command.
pub fn handle_run(cli: &Cli, opts: &Opts) -> Result<()> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    match &cli.command {
        Commands::Directory {
            path,
            shallow,
            list_only,
            type_of,
            ..
        } => {
            if *type_of {
                return handle_typeof(path, opts.symbolic);
            }
            handle_directory(path, opts, !*shallow, *list_only)
        }
        Commands::Copy {
            source,
            destination,
            ..
        } => handle_copy(source, destination, opts),
        Commands::Remove { path } => handle_remove(path),
        Commands::Hash {
            target,
            list,
            string,
            ..
        } => handle_hash(target, *list, *string, opts),
        Commands::Read { path } => handle_read(path),
    }
}

/// Print a path's kind. A missing path is reported, not failed.
fn handle_typeof(path: &Path, symbolic: bool) -> Result<()> {
    println!("{}", classify(path, symbolic)?);
    Ok(())
}

fn handle_directory(path: &Path, opts: &Opts, recursive: bool, list_only: bool) -> Result<()> {
    let walk_opts = WalkOpts {
        exclude: opts.exclude.clone(),
        recursive,
        symbolic: opts.symbolic,
    };
    let walk = enumerate(path, &walk_opts)?;
    let (count, bytes) = (walk.len(), walk.total_size());
    let json = if list_only {
        serde_json::to_string(&walk.into_paths())?
    } else {
        serde_json::to_string(walk.entries())?
    };
    println!("{json}");
    if opts.verbose {
        info!(
            "{} matching items from {} totaling {} bytes",
            Colors::count(commas(count as u64)),
            Colors::path(path),
            Colors::count(commas(bytes))
        );
    }
    Ok(())
}

fn handle_copy(source: &Path, destination: &Path, opts: &Opts) -> Result<()> {
    let copy_opts = CopyOpts {
        exclude: opts.exclude.clone(),
    };
    let summary = copy_tree(source, destination, &copy_opts)?;
    println!("{} copied {summary}", env!("CARGO_PKG_NAME"));
    info!("Copied {} to {}", Colors::path(source), Colors::path(destination));
    Ok(())
}

fn handle_remove(path: &Path) -> Result<()> {
    let summary = remove_tree(path)?;
    println!("{} removed {summary}", env!("CARGO_PKG_NAME"));
    info!("Removed {}", Colors::path(path));
    Ok(())
}

fn handle_hash(target: &str, list: bool, string: bool, opts: &Opts) -> Result<()> {
    if string {
        println!("{}", hash_string(target));
        return Ok(());
    }
    let path = PathBuf::from(target);
    let hash_opts = HashOpts {
        exclude: opts.exclude.clone(),
        batch_size: None,
    };

    let bar: OnceLock<Progress> = OnceLock::new();
    let on_progress = |n: usize, total: usize| {
        if total < PROGRESS_MIN_ENTRIES {
            return;
        }
        update_progress_bar(bar.get_or_init(|| create_progress_bar(total, "Hashing")), n);
    };
    let progress: Option<OnProgress<'_>> = opts.verbose.then_some(&on_progress as OnProgress<'_>);

    let tree = hash_tree(&path, &hash_opts, progress)?;
    if let Some(pb) = bar.get() {
        finish_progress_bar(pb);
    }

    if list {
        println!("{}", serde_json::to_string_pretty(&tree.into_list())?);
    } else {
        if opts.verbose {
            info!("hashed {} ({} entries)", Colors::path(&path), tree.len());
        }
        println!("{}", tree.aggregate());
    }
    Ok(())
}

fn handle_read(path: &Path) -> Result<()> {
    match read_file(path)? {
        FileContents::Text(text) => {
            let mut out = std::io::stdout().lock();
            out.write_all(text.as_bytes())
                .context("writing to stdout")?;
        }
        FileContents::Binary(bytes) => {
            println!("binary file, {} bytes", commas(bytes.len() as u64));
        }
    }
    Ok(())
}
