//! fsbulk: concurrent walk, copy, remove and hash over local directory trees

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use engine::{
    copy_tree, hash_list, hash_path, hash_stream, hash_string, read_file, read_files, remove_tree,
};
pub use error::FsError;
pub use pipeline::{classify, enumerate, list_paths};

/// Result alias used by public fsbulk API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
