//! Engine module: the bulk operations and the CLI layer that drives them

pub mod arg_parser;
pub mod copy;
pub mod digest;
pub mod handlers;
pub mod hashing;
pub mod makedir;
pub mod progress;
pub mod reader;
pub mod remove;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::{Cli, Commands, GlobalArgs};
pub use copy::copy_tree;
pub use digest::{TreeDigest, hash_list, hash_path, hash_stream, hash_string, hash_tree};
pub use handlers::{handle_run, resolve_opts};
pub use makedir::{make_dir, make_dir_all};
pub use reader::{read_file, read_files};
pub use remove::{remove_tree, remove_tree_with};
pub use tools::{is_excluded, path_relative_to};
